// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Execution context: the shared thread pool and the distributed collective
//!
//! The pipeline schedules everything onto one rayon pool owned by the
//! context; rank-to-rank communication goes through the [`Distributed`]
//! collective. A single-rank run uses [`LocalDistributed`], whose collectives
//! are identities.

use std::sync::Arc;

use synfire_neural::{Spike, TimeType};

use crate::error::{Result, SimulationError};
use crate::labels::LabelTable;

/// Collective operations across simulation ranks.
///
/// Implementations must be deterministic: gathers return rank blocks in rank
/// order, so identical runs see identical gathered sequences.
pub trait Distributed: Send + Sync {
    fn rank(&self) -> usize;

    fn num_ranks(&self) -> usize;

    /// All-gather of spikes: every rank receives the concatenation of all
    /// ranks' local spikes, in rank order.
    fn gather_spikes(&self, local: &[Spike]) -> Result<Vec<Spike>>;

    /// All-gather of label tables, used once at construction to build the
    /// global source resolution map.
    fn gather_labels(&self, local: &LabelTable) -> Result<LabelTable>;

    /// Global minimum of a per-rank time value.
    fn min_time(&self, local: TimeType) -> Result<TimeType>;
}

/// Single-rank collective: every gather is the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDistributed;

impl Distributed for LocalDistributed {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn gather_spikes(&self, local: &[Spike]) -> Result<Vec<Spike>> {
        Ok(local.to_vec())
    }

    fn gather_labels(&self, local: &LabelTable) -> Result<LabelTable> {
        Ok(local.clone())
    }

    fn min_time(&self, local: TimeType) -> Result<TimeType> {
        Ok(local)
    }
}

/// Shared resources a simulation runs on.
#[derive(Clone)]
pub struct ExecutionContext {
    pool: Arc<rayon::ThreadPool>,
    pub distributed: Arc<dyn Distributed>,
}

impl ExecutionContext {
    /// Context with a dedicated pool of `threads` workers and the given
    /// collective.
    pub fn new(threads: usize, distributed: Arc<dyn Distributed>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("synfire-worker-{i}"))
            .build()
            .map_err(|e| SimulationError::Collaborator(format!("thread pool: {e}")))?;
        Ok(Self {
            pool: Arc::new(pool),
            distributed,
        })
    }

    /// Single-rank context sized by rayon's default heuristic (one worker per
    /// available core).
    pub fn local() -> Result<Self> {
        Self::new(0, Arc::new(LocalDistributed))
    }

    /// Single-rank context with an explicit worker count.
    pub fn with_threads(threads: usize) -> Result<Self> {
        Self::new(threads, Arc::new(LocalDistributed))
    }

    pub fn pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.pool
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}
