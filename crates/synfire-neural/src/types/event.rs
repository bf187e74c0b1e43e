// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Post-synaptic events delivered to cells

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::time::TimeType;

/// A weighted input scheduled for delivery to one target on a cell.
///
/// `target` is the cell-local target index (the synapse index on the
/// receiving cell); the receiving cell itself is identified positionally by
/// the event lane or pending buffer the event sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PostSynapticEvent {
    /// Target index on the receiving cell
    pub target: u32,
    /// Synaptic weight applied on delivery
    pub weight: f32,
    /// Delivery time
    pub time: TimeType,
}

impl PostSynapticEvent {
    pub fn new(target: u32, weight: f32, time: TimeType) -> Self {
        Self {
            target,
            weight,
            time,
        }
    }
}

// Ordering key is time; ties break by target then weight so that sorts are
// stable and runs are reproducible event-for-event.
impl PartialEq for PostSynapticEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PostSynapticEvent {}

impl PartialOrd for PostSynapticEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PostSynapticEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.target.cmp(&other.target))
            .then_with(|| self.weight.total_cmp(&other.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let early = PostSynapticEvent::new(5, 0.5, 1.0);
        let late = PostSynapticEvent::new(0, 0.5, 2.0);
        let tie_low_target = PostSynapticEvent::new(1, 0.9, 2.0);

        let mut events = vec![late, early, tie_low_target];
        events.sort();
        assert_eq!(events, vec![early, tie_low_target, late]);
    }

    #[test]
    fn test_equal_time_ties_break_by_weight_last() {
        let light = PostSynapticEvent::new(2, 0.1, 3.0);
        let heavy = PostSynapticEvent::new(2, 0.8, 3.0);
        assert!(light < heavy);
    }
}
