// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The cell group contract and the factory that builds groups
//!
//! A cell group owns the state of a batch of same-kind cells and advances
//! them epoch by epoch. Groups advance concurrently with each other, but a
//! group works through its own lane slice sequentially in time order, which
//! is what keeps per-cell state updates ordered.

use synfire_neural::{Epoch, Spike, TimeType};

use crate::error::{Result, SimulationError};
use crate::event_lanes::EventLane;
use crate::labels::LabelTable;
use crate::recipe::{Backend, CellKind, GroupDescription, Recipe};
use crate::sampler::{BinningKind, ProbeId, ProbeMetadata, SamplerAssociation, SamplerHandle};

pub trait CellGroup: Send {
    /// Rewind all cell state to time zero.
    fn reset(&mut self);

    /// Integrate every cell to `epoch.t1` with timestep `dt`, consuming the
    /// group's slice of event lanes (one lane per cell, in gid order).
    /// Emitted spikes accumulate internally until `clear_spikes`.
    fn advance(&mut self, epoch: Epoch, dt: TimeType, lanes: &[EventLane]) -> Result<()>;

    fn spikes(&self) -> &[Spike];

    fn clear_spikes(&mut self);

    fn add_sampler(&mut self, assoc: SamplerAssociation);

    fn remove_sampler(&mut self, handle: SamplerHandle);

    fn remove_all_samplers(&mut self);

    fn probe_metadata(&self, _probe: ProbeId) -> Vec<ProbeMetadata> {
        Vec::new()
    }

    fn set_binning_policy(&mut self, _kind: BinningKind, _interval: TimeType) {}
}

pub type CellGroupBox = Box<dyn CellGroup>;

/// Builds a group from its description, registering the labelled source and
/// target ranges of every cell into the given tables as it goes.
pub type GroupFactory =
    fn(&GroupDescription, &dyn Recipe, &mut LabelTable, &mut LabelTable) -> Result<CellGroupBox>;

/// Select the implementation for a (kind, backend) pair.
pub fn cell_group_factory(kind: CellKind, backend: Backend) -> Result<GroupFactory> {
    match backend {
        Backend::Multicore => {}
        Backend::Gpu => {
            return Err(SimulationError::Collaborator(format!(
                "no gpu implementation for cell kind {kind:?}"
            )))
        }
    }
    Ok(match kind {
        CellKind::Lif => crate::groups::lif::make_group,
        CellKind::SpikeSource => crate::groups::spike_source::make_group,
        CellKind::Relay => crate::groups::relay::make_group,
    })
}
