// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sampler associations and probe metadata
//!
//! Samplers observe probes (named measurable quantities on cells) on a
//! schedule. The simulation owns the handle space; cell groups own the
//! associations themselves and invoke the callbacks during their update.

use core::fmt;
use std::sync::Arc;

use synfire_neural::{CellGid, TimeType};

use crate::schedule::Schedule;

/// Opaque identity of one sampler association across all groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerHandle(pub(crate) u32);

impl fmt::Display for SamplerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sampler({})", self.0)
    }
}

/// Handle allocator: a monotonic counter with a free list.
///
/// Released values are reissued before the counter grows, and a live handle
/// never aliases another.
#[derive(Debug, Default)]
pub struct HandleSet {
    next: u32,
    free: Vec<u32>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self) -> SamplerHandle {
        match self.free.pop() {
            Some(h) => SamplerHandle(h),
            None => {
                let h = self.next;
                self.next += 1;
                SamplerHandle(h)
            }
        }
    }

    pub fn release(&mut self, h: SamplerHandle) {
        self.free.push(h.0);
    }

    /// Back to the initial state: counter at zero, free pool empty.
    pub fn clear(&mut self) {
        self.next = 0;
        self.free.clear();
    }
}

/// A measurable quantity on a cell, addressed by gid and probe index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeId {
    pub gid: CellGid,
    pub index: u32,
}

/// What a probe measures, as reported by its cell group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMetadata {
    pub id: ProbeId,
    pub tag: String,
}

/// One sampled value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: TimeType,
    pub value: f64,
}

/// Selects which probes a sampler observes.
pub type ProbePredicate = Arc<dyn Fn(ProbeId) -> bool + Send + Sync>;

/// Receives batches of samples for one probe.
pub type SamplerFn = Arc<dyn Fn(ProbeId, &[Sample]) + Send + Sync>;

/// How strictly sample times must match the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPolicy {
    /// Sample at the nearest integration step; cheap and usually sufficient.
    Lax,
    /// Sample exactly at the scheduled times.
    Exact,
}

/// Membrane-potential binning applied by groups that support it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinningKind {
    None,
    Regular,
    Following,
}

/// Everything a group needs to service one sampler.
#[derive(Clone)]
pub struct SamplerAssociation {
    pub handle: SamplerHandle,
    pub probes: ProbePredicate,
    pub schedule: Schedule,
    pub callback: SamplerFn,
    pub policy: SamplingPolicy,
}

impl fmt::Debug for SamplerAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerAssociation")
            .field("handle", &self.handle)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
