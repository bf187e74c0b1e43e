// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # LIF (Leaky Integrate-and-Fire) Cell Group
//!
//! ## Model Dynamics
//!
//! ```text
//! Per integration step of length dt:
//!     I_syn = Σ weight for all events delivered during the step
//!     V(t+dt) = V(t) + I_syn - g_leak × (V(t) - V_rest)
//!
//! Firing Check:
//!     if t ≥ refractory_until and V ≥ threshold:
//!         FIRE, V := V_rest, refractory_until := t + refractory_period
//! ```
//!
//! Each cell exposes one probe (index 0): the membrane potential.

use synfire_neural::{CellGid, Epoch, Spike, TimeType};

use crate::cell_group::{CellGroup, CellGroupBox};
use crate::error::{Result, SimulationError};
use crate::event_lanes::EventLane;
use crate::labels::LabelTable;
use crate::recipe::{CellDescription, GroupDescription, Recipe};
use crate::sampler::{
    BinningKind, ProbeId, ProbeMetadata, Sample, SamplerAssociation, SamplerHandle,
};

/// LIF cell parameters.
#[derive(Debug, Clone, Copy)]
pub struct LifParameters {
    /// Firing threshold.
    pub threshold: f64,
    /// Fraction of (V - V_rest) lost per integration step, in [0, 1].
    pub leak_coefficient: f64,
    /// Baseline membrane potential.
    pub resting_potential: f64,
    /// Time after a firing during which input is ignored.
    pub refractory_period: TimeType,
}

impl Default for LifParameters {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            leak_coefficient: 0.1,
            resting_potential: 0.0,
            refractory_period: 2.0,
        }
    }
}

pub struct LifGroup {
    gids: Vec<CellGid>,
    params: Vec<LifParameters>,
    potential: Vec<f64>,
    refractory_until: Vec<TimeType>,
    spikes: Vec<Spike>,
    samplers: Vec<SamplerAssociation>,
    binning: BinningKind,
    bin_interval: TimeType,
}

/// Factory entry point: one LIF cell per gid, each exporting one spike
/// detector ("src") and one synaptic target ("syn").
pub fn make_group(
    group: &GroupDescription,
    recipe: &dyn Recipe,
    sources: &mut LabelTable,
    targets: &mut LabelTable,
) -> Result<CellGroupBox> {
    let mut params = Vec::with_capacity(group.gids.len());
    for &gid in &group.gids {
        match recipe.cell_description(gid) {
            CellDescription::Lif(p) => params.push(p),
            other => {
                return Err(SimulationError::Collaborator(format!(
                    "{gid} described as {other:?} in a lif group"
                )))
            }
        }
        sources.add_cell(gid, &[("src", 1)]);
        targets.add_cell(gid, &[("syn", 1)]);
    }
    let potential = params.iter().map(|p| p.resting_potential).collect();
    Ok(Box::new(LifGroup {
        gids: group.gids.clone(),
        params,
        potential,
        refractory_until: vec![0.0; group.gids.len()],
        spikes: Vec::new(),
        samplers: Vec::new(),
        binning: BinningKind::None,
        bin_interval: 0.0,
    }))
}

impl LifGroup {
    fn bin_time(&self, t: TimeType) -> TimeType {
        match self.binning {
            BinningKind::None => t,
            // Both binned kinds snap sample times onto the bin grid.
            BinningKind::Regular | BinningKind::Following => {
                if self.bin_interval > 0.0 {
                    (t / self.bin_interval).floor() * self.bin_interval
                } else {
                    t
                }
            }
        }
    }
}

impl CellGroup for LifGroup {
    fn reset(&mut self) {
        for (v, p) in self.potential.iter_mut().zip(&self.params) {
            *v = p.resting_potential;
        }
        self.refractory_until.iter_mut().for_each(|t| *t = 0.0);
        self.spikes.clear();
        for assoc in &mut self.samplers {
            assoc.schedule.reset();
        }
    }

    fn advance(&mut self, epoch: Epoch, dt: TimeType, lanes: &[EventLane]) -> Result<()> {
        if lanes.len() != self.gids.len() {
            return Err(SimulationError::Collaborator(format!(
                "lif group of {} cells handed {} event lanes",
                self.gids.len(),
                lanes.len()
            )));
        }

        // Sample times are per association, shared by every cell in the
        // group; compute them once per epoch.
        let sample_times: Vec<Vec<TimeType>> = self
            .samplers
            .iter_mut()
            .map(|assoc| assoc.schedule.events(epoch.t0, epoch.t1))
            .collect();
        let mut samples: Vec<Vec<Vec<Sample>>> =
            vec![vec![Vec::new(); lanes.len()]; self.samplers.len()];

        for (ci, lane) in lanes.iter().enumerate() {
            let probe = ProbeId {
                gid: self.gids[ci],
                index: 0,
            };
            let observed: Vec<bool> = self
                .samplers
                .iter()
                .map(|assoc| (assoc.probes)(probe))
                .collect();

            let p = self.params[ci];
            let mut v = self.potential[ci];
            let mut refractory_until = self.refractory_until[ci];
            let mut cursor = 0usize;
            let mut sample_cursors = vec![0usize; sample_times.len()];

            let mut t = epoch.t0;
            while t < epoch.t1 {
                let t_end = TimeType::min(t + dt, epoch.t1);

                // Record samples that fall inside this step, before the state
                // moves past them.
                for (si, times) in sample_times.iter().enumerate() {
                    if !observed[si] {
                        continue;
                    }
                    let cur = &mut sample_cursors[si];
                    while *cur < times.len() && times[*cur] < t_end {
                        samples[si][ci].push(Sample {
                            time: self.bin_time(times[*cur]),
                            value: v,
                        });
                        *cur += 1;
                    }
                }

                // Deliver every event scheduled before the step boundary.
                let mut input = 0.0f64;
                while cursor < lane.len() && lane[cursor].time < t_end {
                    if t_end > refractory_until {
                        input += f64::from(lane[cursor].weight);
                    }
                    cursor += 1;
                }

                v = v + input - p.leak_coefficient * (v - p.resting_potential);

                if t_end > refractory_until && v >= p.threshold {
                    self.spikes.push(Spike::new(self.gids[ci], t_end));
                    v = p.resting_potential;
                    refractory_until = t_end + p.refractory_period;
                }

                t = t_end;
            }

            self.potential[ci] = v;
            self.refractory_until[ci] = refractory_until;
        }

        // Hand each association its batches, one callback per observed probe.
        for (si, assoc) in self.samplers.iter().enumerate() {
            for (ci, batch) in samples[si].iter().enumerate() {
                if batch.is_empty() {
                    continue;
                }
                let probe = ProbeId {
                    gid: self.gids[ci],
                    index: 0,
                };
                (assoc.callback)(probe, batch);
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

    fn add_sampler(&mut self, assoc: SamplerAssociation) {
        self.samplers.push(assoc);
    }

    fn remove_sampler(&mut self, handle: SamplerHandle) {
        self.samplers.retain(|a| a.handle != handle);
    }

    fn remove_all_samplers(&mut self) {
        self.samplers.clear();
    }

    fn probe_metadata(&self, probe: ProbeId) -> Vec<ProbeMetadata> {
        if probe.index == 0 && self.gids.contains(&probe.gid) {
            vec![ProbeMetadata {
                id: probe,
                tag: "membrane-voltage".to_owned(),
            }]
        } else {
            Vec::new()
        }
    }

    fn set_binning_policy(&mut self, kind: BinningKind, interval: TimeType) {
        self.binning = kind;
        self.bin_interval = interval;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::recipe::{Backend, CellKind};
    use crate::sampler::SamplingPolicy;
    use crate::schedule::Schedule;
    use parking_lot::Mutex;
    use synfire_neural::{Epoch, PostSynapticEvent};

    struct LifRecipe;

    impl Recipe for LifRecipe {
        fn num_cells(&self) -> usize {
            1
        }
        fn cell_kind(&self, _gid: CellGid) -> CellKind {
            CellKind::Lif
        }
        fn cell_description(&self, _gid: CellGid) -> CellDescription {
            CellDescription::Lif(LifParameters {
                leak_coefficient: 0.0,
                ..LifParameters::default()
            })
        }
    }

    fn group() -> CellGroupBox {
        let desc = GroupDescription {
            kind: CellKind::Lif,
            backend: Backend::Multicore,
            gids: vec![CellGid(0)],
        };
        let (mut s, mut t) = (LabelTable::new(), LabelTable::new());
        make_group(&desc, &LifRecipe, &mut s, &mut t).unwrap()
    }

    #[test]
    fn test_suprathreshold_event_fires_once() {
        let mut g = group();
        let lane = vec![PostSynapticEvent::new(0, 1.5, 0.25)];
        g.advance(Epoch::new(0, 0.0, 1.0), 0.1, std::slice::from_ref(&lane))
            .unwrap();

        let spikes = g.spikes().to_vec();
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].source, CellGid(0));
        // Fires at the end of the step containing the event.
        assert!((spikes[0].time - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_refractory_period_suppresses_second_event() {
        let mut g = group();
        // Second event lands inside the 2.0 refractory window.
        let lane = vec![
            PostSynapticEvent::new(0, 1.5, 0.2),
            PostSynapticEvent::new(0, 1.5, 0.9),
        ];
        g.advance(Epoch::new(0, 0.0, 1.5), 0.1, std::slice::from_ref(&lane))
            .unwrap();
        assert_eq!(g.spikes().len(), 1);
    }

    #[test]
    fn test_subthreshold_input_does_not_fire() {
        let mut g = group();
        let lane = vec![PostSynapticEvent::new(0, 0.4, 0.5)];
        g.advance(Epoch::new(0, 0.0, 1.0), 0.1, std::slice::from_ref(&lane))
            .unwrap();
        assert!(g.spikes().is_empty());
    }

    #[test]
    fn test_sampler_sees_membrane_potential() {
        let mut g = group();
        let seen: Arc<Mutex<Vec<Sample>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        g.add_sampler(SamplerAssociation {
            handle: SamplerHandle(0),
            probes: Arc::new(|_| true),
            schedule: Schedule::regular(0.0, 0.5),
            callback: Arc::new(move |_, batch| sink.lock().extend_from_slice(batch)),
            policy: SamplingPolicy::Lax,
        });

        let lane: EventLane = Vec::new();
        g.advance(Epoch::new(0, 0.0, 1.0), 0.1, std::slice::from_ref(&lane))
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2); // t = 0.0 and t = 0.5
        assert!(seen.iter().all(|s| s.value == 0.0));
    }

    #[test]
    fn test_probe_metadata_for_member_and_foreign_cells() {
        let g = group();
        let known = ProbeId {
            gid: CellGid(0),
            index: 0,
        };
        assert_eq!(g.probe_metadata(known).len(), 1);
        let foreign = ProbeId {
            gid: CellGid(99),
            index: 0,
        };
        assert!(g.probe_metadata(foreign).is_empty());
    }
}
