// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated-time scalar

/// Simulated time in milliseconds.
///
/// All time comparisons in the core are strict; `0.0` is the canonical reset
/// point.
pub type TimeType = f64;

/// Sentinel for "no upper bound on time". A network with no connections has
/// an infinite minimum delay, which makes the whole run a single epoch.
pub const TIME_MAX: TimeType = f64::INFINITY;
