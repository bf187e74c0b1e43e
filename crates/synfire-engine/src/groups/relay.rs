// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Relay cells
//!
//! A relay cell re-emits every delivered event as a spike at the delivery
//! time, and can record what it received together with the epoch it arrived
//! in. That makes delivery timing observable from the outside, which is what
//! validation runs and the end-to-end tests lean on.

use std::sync::Arc;

use parking_lot::Mutex;

use synfire_neural::{CellGid, Epoch, PostSynapticEvent, Spike, TimeType};

use crate::cell_group::{CellGroup, CellGroupBox};
use crate::error::{Result, SimulationError};
use crate::event_lanes::EventLane;
use crate::labels::LabelTable;
use crate::recipe::{CellDescription, GroupDescription, Recipe};
use crate::sampler::{SamplerAssociation, SamplerHandle};

/// An event as a relay cell saw it: the epoch id it was integrated in plus
/// the event itself.
pub type DeliveryRecord = (i64, PostSynapticEvent);

/// Shared log of deliveries, cloneable across the recipe boundary.
#[derive(Debug, Clone, Default)]
pub struct DeliveryRecorder {
    log: Arc<Mutex<Vec<DeliveryRecord>>>,
}

impl DeliveryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, epoch_id: i64, event: PostSynapticEvent) {
        self.log.lock().push((epoch_id, event));
    }

    pub fn snapshot(&self) -> Vec<DeliveryRecord> {
        self.log.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelayDescription {
    pub recorder: Option<DeliveryRecorder>,
}

pub struct RelayGroup {
    gids: Vec<CellGid>,
    recorders: Vec<Option<DeliveryRecorder>>,
    spikes: Vec<Spike>,
}

/// Factory entry point: one detector ("src") and one target ("syn") per cell.
pub fn make_group(
    group: &GroupDescription,
    recipe: &dyn Recipe,
    sources: &mut LabelTable,
    targets: &mut LabelTable,
) -> Result<CellGroupBox> {
    let mut recorders = Vec::with_capacity(group.gids.len());
    for &gid in &group.gids {
        match recipe.cell_description(gid) {
            CellDescription::Relay(d) => recorders.push(d.recorder),
            other => {
                return Err(SimulationError::Collaborator(format!(
                    "{gid} described as {other:?} in a relay group"
                )))
            }
        }
        sources.add_cell(gid, &[("src", 1)]);
        targets.add_cell(gid, &[("syn", 1)]);
    }
    Ok(Box::new(RelayGroup {
        gids: group.gids.clone(),
        recorders,
        spikes: Vec::new(),
    }))
}

impl CellGroup for RelayGroup {
    fn reset(&mut self) {
        self.spikes.clear();
        for rec in self.recorders.iter().flatten() {
            rec.clear();
        }
    }

    fn advance(&mut self, epoch: Epoch, _dt: TimeType, lanes: &[EventLane]) -> Result<()> {
        for (ci, lane) in lanes.iter().enumerate() {
            for ev in lane.iter().take_while(|ev| ev.time < epoch.t1) {
                self.spikes.push(Spike::new(self.gids[ci], ev.time));
                if let Some(rec) = &self.recorders[ci] {
                    rec.record(epoch.id, *ev);
                }
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

    fn add_sampler(&mut self, _assoc: SamplerAssociation) {}

    fn remove_sampler(&mut self, _handle: SamplerHandle) {}

    fn remove_all_samplers(&mut self) {}
}
