// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike events emitted by cells during integration

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::ids::CellGid;
use super::time::TimeType;

/// A single spike: a cell fired at a point in simulated time.
///
/// Spikes are produced by cell groups during the update phase and never
/// mutated afterwards; the exchange phase only copies them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Spike {
    /// Global id of the cell that fired
    pub source: CellGid,
    /// Simulated time of the firing
    pub time: TimeType,
}

impl Spike {
    pub fn new(source: CellGid, time: TimeType) -> Self {
        Self { source, time }
    }
}

// Total order by (time, source) via total_cmp so that sorting is well-defined
// for every bit pattern and gathered sequences are deterministic.
impl PartialEq for Spike {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Spike {}

impl PartialOrd for Spike {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Spike {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.source.cmp(&other.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_ordering_by_time_then_source() {
        let a = Spike::new(CellGid(7), 1.0);
        let b = Spike::new(CellGid(3), 2.0);
        let c = Spike::new(CellGid(1), 1.0);

        let mut spikes = vec![a, b, c];
        spikes.sort();
        assert_eq!(spikes, vec![c, a, b]);
    }
}
