// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Schedule-driven spike sources
//!
//! A spike-source cell fires exactly at its schedule's times and ignores all
//! synaptic input. Useful as stimulus and in tests.

use synfire_neural::{CellGid, Epoch, Spike, TimeType};

use crate::cell_group::{CellGroup, CellGroupBox};
use crate::error::{Result, SimulationError};
use crate::event_lanes::EventLane;
use crate::labels::LabelTable;
use crate::recipe::{CellDescription, GroupDescription, Recipe};
use crate::sampler::{SamplerAssociation, SamplerHandle};
use crate::schedule::Schedule;

pub struct SpikeSourceGroup {
    gids: Vec<CellGid>,
    schedules: Vec<Schedule>,
    spikes: Vec<Spike>,
}

/// Factory entry point: each cell exports one spike detector ("src") and no
/// synaptic targets.
pub fn make_group(
    group: &GroupDescription,
    recipe: &dyn Recipe,
    sources: &mut LabelTable,
    _targets: &mut LabelTable,
) -> Result<CellGroupBox> {
    let mut schedules = Vec::with_capacity(group.gids.len());
    for &gid in &group.gids {
        match recipe.cell_description(gid) {
            CellDescription::SpikeSource(s) => schedules.push(s),
            other => {
                return Err(SimulationError::Collaborator(format!(
                    "{gid} described as {other:?} in a spike-source group"
                )))
            }
        }
        sources.add_cell(gid, &[("src", 1)]);
    }
    Ok(Box::new(SpikeSourceGroup {
        gids: group.gids.clone(),
        schedules,
        spikes: Vec::new(),
    }))
}

impl CellGroup for SpikeSourceGroup {
    fn reset(&mut self) {
        self.schedules.iter_mut().for_each(Schedule::reset);
        self.spikes.clear();
    }

    fn advance(&mut self, epoch: Epoch, _dt: TimeType, _lanes: &[EventLane]) -> Result<()> {
        for (gid, schedule) in self.gids.iter().zip(&mut self.schedules) {
            for t in schedule.events(epoch.t0, epoch.t1) {
                self.spikes.push(Spike::new(*gid, t));
            }
        }
        Ok(())
    }

    fn spikes(&self) -> &[Spike] {
        &self.spikes
    }

    fn clear_spikes(&mut self) {
        self.spikes.clear();
    }

    // Spike sources expose no probes, so sampler bookkeeping has nothing to
    // observe.
    fn add_sampler(&mut self, _assoc: SamplerAssociation) {}

    fn remove_sampler(&mut self, _handle: SamplerHandle) {}

    fn remove_all_samplers(&mut self) {}
}
