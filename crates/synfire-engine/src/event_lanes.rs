// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Double-buffered per-cell event lanes
//!
//! Two banks of lanes, selected by epoch parity: while one bank is consumed
//! by the update of epoch k, the other is filled with events for epoch k+1.
//! The pipeline schedule guarantees that a bank is never read and written in
//! the same parallel batch, so no locking is needed here.

use synfire_neural::{epoch_parity, PostSynapticEvent};

/// Time-sorted events destined for a single cell.
pub type EventLane = Vec<PostSynapticEvent>;

#[derive(Debug, Default)]
pub struct EventLaneStore {
    banks: [Vec<EventLane>; 2],
}

impl EventLaneStore {
    pub fn new(num_cells: usize) -> Self {
        Self {
            banks: [vec![Vec::new(); num_cells], vec![Vec::new(); num_cells]],
        }
    }

    pub fn num_cells(&self) -> usize {
        self.banks[0].len()
    }

    /// The bank consumed by (or being built for) the given epoch id.
    pub fn bank(&self, epoch_id: i64) -> &[EventLane] {
        &self.banks[epoch_parity(epoch_id)]
    }

    /// Borrow the previous epoch's bank for reading and the bank for
    /// `write_epoch_id` for writing, at once. Used by the enqueue phase,
    /// which merges the old lane into the new one.
    pub fn read_write(&mut self, write_epoch_id: i64) -> (&[EventLane], &mut [EventLane]) {
        let [even, odd] = &mut self.banks;
        if epoch_parity(write_epoch_id) == 0 {
            (odd.as_slice(), even.as_mut_slice())
        } else {
            (even.as_slice(), odd.as_mut_slice())
        }
    }

    /// Drop every queued event in both banks, keeping lane allocations.
    pub fn reset(&mut self) {
        for bank in &mut self.banks {
            for lane in bank.iter_mut() {
                lane.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banks_alternate_by_parity() {
        let mut store = EventLaneStore::new(2);
        let (_, write) = store.read_write(0);
        write[0].push(PostSynapticEvent::new(0, 1.0, 0.25));

        // Epoch 1 reads what epoch 0 wrote.
        let (read, _) = store.read_write(1);
        assert_eq!(read[0].len(), 1);
        assert!(store.bank(2)[0].len() == 1);
        assert!(store.bank(1)[0].is_empty());
    }

    #[test]
    fn test_reset_clears_both_banks() {
        let mut store = EventLaneStore::new(1);
        store.read_write(0).1[0].push(PostSynapticEvent::new(0, 1.0, 0.0));
        store.read_write(1).1[0].push(PostSynapticEvent::new(0, 1.0, 0.5));
        store.reset();
        assert!(store.bank(0)[0].is_empty());
        assert!(store.bank(1)[0].is_empty());
    }
}
