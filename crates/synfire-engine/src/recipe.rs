// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Recipe and domain decomposition
//!
//! The recipe is the query-only description of the model: what kind of cell
//! each gid is, how cells connect, and which generators feed them. The
//! decomposition says which cells this rank owns and how they are grouped.
//! Both are read concurrently during construction and must not change
//! afterwards.

use synfire_neural::{CellGid, TimeType};

use crate::generator::EventGeneratorSpec;
use crate::groups::lif::LifParameters;
use crate::groups::relay::RelayDescription;
use crate::schedule::Schedule;

/// Cell model families the factory can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Leaky integrate-and-fire dynamics.
    Lif,
    /// Fires on a schedule, ignores all input.
    SpikeSource,
    /// Re-emits every delivered event as a spike; diagnostic.
    Relay,
}

/// Hardware backend a group runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Multicore,
    Gpu,
}

/// Per-kind construction payload for one cell.
#[derive(Debug, Clone)]
pub enum CellDescription {
    Lif(LifParameters),
    SpikeSource(Schedule),
    Relay(RelayDescription),
}

/// One synaptic connection, described from the target side.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    /// Gid of the presynaptic cell.
    pub source_gid: CellGid,
    /// Label of the spike source on the presynaptic cell.
    pub source_label: String,
    /// Label of the target on the cell the spec was queried for.
    pub dest_label: String,
    pub weight: f32,
    /// Synaptic transmission delay; must be positive.
    pub delay: TimeType,
}

/// Query-only model description, safe for concurrent reads.
pub trait Recipe: Send + Sync {
    /// Number of cells across all ranks.
    fn num_cells(&self) -> usize;

    fn cell_kind(&self, gid: CellGid) -> CellKind;

    fn cell_description(&self, gid: CellGid) -> CellDescription;

    /// Connections terminating on `gid`.
    fn connections_on(&self, _gid: CellGid) -> Vec<ConnectionSpec> {
        Vec::new()
    }

    /// Generators feeding `gid`.
    fn event_generators(&self, _gid: CellGid) -> Vec<EventGeneratorSpec> {
        Vec::new()
    }
}

/// One group of same-kind cells advanced together on one backend.
#[derive(Debug, Clone)]
pub struct GroupDescription {
    pub kind: CellKind,
    pub backend: Backend,
    pub gids: Vec<CellGid>,
}

/// The set of groups owned by this rank.
#[derive(Debug, Clone, Default)]
pub struct DomainDecomposition {
    groups: Vec<GroupDescription>,
}

impl DomainDecomposition {
    pub fn new(groups: Vec<GroupDescription>) -> Self {
        Self { groups }
    }

    /// Single-rank decomposition: consecutive same-kind gids share a group on
    /// the multicore backend.
    pub fn partition(recipe: &dyn Recipe) -> Self {
        let mut groups: Vec<GroupDescription> = Vec::new();
        for raw in 0..recipe.num_cells() as u32 {
            let gid = CellGid(raw);
            let kind = recipe.cell_kind(gid);
            match groups.last_mut() {
                Some(g) if g.kind == kind => g.gids.push(gid),
                _ => groups.push(GroupDescription {
                    kind,
                    backend: Backend::Multicore,
                    gids: vec![gid],
                }),
            }
        }
        Self { groups }
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, i: usize) -> &GroupDescription {
        &self.groups[i]
    }

    pub fn groups(&self) -> &[GroupDescription] {
        &self.groups
    }

    pub fn num_local_cells(&self) -> usize {
        self.groups.iter().map(|g| g.gids.len()).sum()
    }
}
