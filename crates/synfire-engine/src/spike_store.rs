// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Thread-local spike accumulation
//!
//! During the update phase every worker thread appends the spikes of the
//! groups it advances into its own partition, so insertion never contends.
//! `gather()` flattens and sorts the partitions; sorting by (time, source)
//! makes the result independent of how rayon assigned groups to threads,
//! which the determinism guarantee of the pipeline relies on.

use parking_lot::Mutex;

use synfire_neural::Spike;

#[derive(Debug)]
pub struct LocalSpikeStore {
    partitions: Vec<Mutex<Vec<Spike>>>,
}

impl LocalSpikeStore {
    /// One partition per pool thread (plus one for calls from outside the
    /// pool, e.g. the single-epoch boundary path).
    pub fn new(num_threads: usize) -> Self {
        let partitions = (0..num_threads.max(1) + 1)
            .map(|_| Mutex::new(Vec::new()))
            .collect();
        Self { partitions }
    }

    /// Append spikes from the calling thread. The lock is uncontended in the
    /// steady state: each pool thread hits only its own partition.
    pub fn insert(&self, spikes: &[Spike]) {
        let slot = rayon::current_thread_index()
            .map(|i| i % (self.partitions.len() - 1))
            .unwrap_or(self.partitions.len() - 1);
        self.partitions[slot].lock().extend_from_slice(spikes);
    }

    /// Flatten all partitions into one (time, source)-sorted sequence.
    pub fn gather(&self) -> Vec<Spike> {
        let mut out = Vec::new();
        for p in &self.partitions {
            out.extend_from_slice(&p.lock());
        }
        out.sort_unstable();
        out
    }

    pub fn clear(&self) {
        for p in &self.partitions {
            p.lock().clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|p| p.lock().is_empty())
    }
}
