// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell group implementations

pub mod lif;
pub mod relay;
pub mod spike_source;
