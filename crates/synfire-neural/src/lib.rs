// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Synfire Neural Types
//!
//! Core value types shared by the synfire simulation core: simulated time,
//! cell identities, spikes, post-synaptic events and integration epochs.
//!
//! These types are deliberately small and `Copy` where possible; everything
//! stateful (lanes, stores, the pipeline itself) lives in `synfire-engine`.

pub mod types;

pub use types::epoch::{next_epoch, parity as epoch_parity, Epoch};
pub use types::event::PostSynapticEvent;
pub use types::ids::CellGid;
pub use types::spike::Spike;
pub use types::time::{TimeType, TIME_MAX};
