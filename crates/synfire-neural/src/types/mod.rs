// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neural Types Module
//!
//! Type definitions for synfire simulation state.

pub mod epoch;
pub mod event;
pub mod ids;
pub mod spike;
pub mod time;

pub use epoch::{next_epoch, Epoch};
pub use event::PostSynapticEvent;
pub use ids::CellGid;
pub use spike::Spike;
pub use time::{TimeType, TIME_MAX};
