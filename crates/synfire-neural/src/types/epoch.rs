// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration epochs
//!
//! An epoch is a half-open interval `[t0, t1)` of simulated time over which
//! cell groups advance independently; network exchange happens at epoch
//! boundaries. The epoch id doubles as the double-buffer selector: state that
//! is double buffered is indexed by `id & 1`.

use serde::{Deserialize, Serialize};

use super::time::TimeType;

/// One integration interval of the pipeline.
///
/// The default value is the sentinel "nothing integrated yet": `id == -1`
/// with an empty interval at time zero. Every epoch that actually runs has
/// `id >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    pub id: i64,
    pub t0: TimeType,
    pub t1: TimeType,
}

impl Default for Epoch {
    fn default() -> Self {
        Self {
            id: -1,
            t0: 0.0,
            t1: 0.0,
        }
    }
}

impl Epoch {
    pub fn new(id: i64, t0: TimeType, t1: TimeType) -> Self {
        Self { id, t0, t1 }
    }

    /// An epoch is empty when it covers no time at all; an empty epoch
    /// signals termination of the pipeline loop.
    pub fn is_empty(&self) -> bool {
        self.t0 == self.t1
    }

    /// Slide the interval forward: `[t0, t1)` becomes `[t1, t)`.
    pub fn advance_to(&mut self, t: TimeType) {
        self.t0 = self.t1;
        self.t1 = t;
        self.id += 1;
    }

    /// Return to the pre-run sentinel state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Double-buffer index for this epoch.
    pub fn parity(&self) -> usize {
        parity(self.id)
    }
}

/// Buffer index for an epoch id. Works on the sentinel id -1 as well, which
/// maps to bank 1 and leaves bank 0 for the first integrated epoch.
pub fn parity(id: i64) -> usize {
    (id & 1) as usize
}

/// The epoch following `e`, at most `interval` long and never past `tfinal`.
///
/// If `tfinal` has already been reached the result is empty (`t0 == t1`).
pub fn next_epoch(e: Epoch, interval: TimeType, tfinal: TimeType) -> Epoch {
    let mut next = e;
    next.advance_to(TimeType::min(e.t1 + interval, tfinal));
    next
}
