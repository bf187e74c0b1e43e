// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Epoch-Pipelined Simulation Driver
//!
//! Advances the model through integration epochs of at most half the network
//! minimum delay. Three tasks overlap inside one run:
//!
//! 1. **Update (U)** — every cell group integrates to the end of the epoch,
//!    consuming its slice of event lanes and emitting spikes.
//! 2. **Exchange (D)** — spikes from a finished epoch are gathered across all
//!    ranks and translated into per-cell pending events.
//! 3. **Enqueue (E)** — pending events, the previous lane's leftovers and
//!    generator events are merged into the lanes of an upcoming epoch.
//!
//! Writing U(k), D(k), E(k) for these on epoch k, the dependencies are:
//! E(k) before U(k); U(k) before D(k); U(k) before U(k+1); D(k) before
//! E(k+2); D(k) before D(k+1). That leaves exactly two parallel pairs,
//! {U(k), E(k+1)} and {U(k), D(k-1)}, which form the steady-state interior
//! of the loop below. Event lanes and spike stores are double buffered by
//! epoch parity so the pairs never touch the same buffer.
//!
//! On entry to and exit from `run()` with resident epoch id k, U(k) and D(k)
//! have completed.

use std::ops::Range;
use std::sync::Arc;

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::{debug, info};

use synfire_neural::{
    epoch_parity, next_epoch, CellGid, Epoch, PostSynapticEvent, Spike, TimeType,
};

use crate::cell_group::{cell_group_factory, CellGroupBox};
use crate::communicator::Communicator;
use crate::context::ExecutionContext;
use crate::error::{Result, SimulationError};
use crate::event_lanes::{EventLane, EventLaneStore};
use crate::generator::EventGenerator;
use crate::labels::{LabelResolutionMap, LabelTable, Resolver};
use crate::merge_events::merge_cell_events;
use crate::recipe::{DomainDecomposition, Recipe};
use crate::sampler::{
    BinningKind, HandleSet, ProbeId, ProbeMetadata, ProbePredicate, SamplerAssociation,
    SamplerFn, SamplerHandle, SamplingPolicy,
};
use crate::schedule::Schedule;
use crate::spike_store::LocalSpikeStore;

/// Receives spike batches from the exchange phase.
pub type SpikeExportFn = Arc<dyn Fn(&[Spike]) + Send + Sync>;

/// Where a gid lives on this rank.
#[derive(Debug, Clone, Copy)]
pub struct LocalCellInfo {
    pub group_index: usize,
    /// Rank-local cell index; doubles as the lane / pending-buffer slot.
    pub cell_index: usize,
}

pub struct Simulation {
    /// Last fully integrated epoch.
    epoch: Epoch,
    /// Maximum epoch duration: half the network minimum delay.
    t_interval: TimeType,
    cell_groups: Vec<CellGroupBox>,
    /// One generator set per local cell, indexed like the lanes.
    generators: Vec<Vec<EventGenerator>>,
    gid_to_local: AHashMap<CellGid, LocalCellInfo>,
    communicator: Communicator,
    /// Lane ranges per group, cached so the update task never borrows the
    /// communicator while an exchange holds it mutably.
    group_ranges: Vec<Range<usize>>,
    /// Events delivered by the most recent exchange, awaiting enqueue.
    pending: Vec<EventLane>,
    lanes: EventLaneStore,
    /// Spike accumulators, double buffered by epoch parity.
    local_spikes: [LocalSpikeStore; 2],
    handles: HandleSet,
    ctx: ExecutionContext,
    local_export: Option<SpikeExportFn>,
    global_export: Option<SpikeExportFn>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Wire up groups, resolution maps, the communicator and all buffers.
    pub fn new(
        recipe: &dyn Recipe,
        decomp: &DomainDecomposition,
        ctx: ExecutionContext,
    ) -> Result<Self> {
        let pool = Arc::clone(ctx.pool());

        // Instantiate the cell groups in parallel, one task per group; each
        // task reports the labelled source/target ranges of its cells.
        let built: Result<Vec<(CellGroupBox, LabelTable, LabelTable)>> = pool.install(|| {
            (0..decomp.num_groups())
                .into_par_iter()
                .map(|i| {
                    let group = decomp.group(i);
                    let factory = cell_group_factory(group.kind, group.backend)?;
                    let mut sources = LabelTable::new();
                    let mut targets = LabelTable::new();
                    let cg = factory(group, recipe, &mut sources, &mut targets)?;
                    Ok((cg, sources, targets))
                })
                .collect()
        });

        let mut cell_groups = Vec::with_capacity(decomp.num_groups());
        let mut local_sources = LabelTable::new();
        let mut local_targets = LabelTable::new();
        for (cg, sources, targets) in built? {
            cell_groups.push(cg);
            local_sources.append(&sources);
            local_targets.append(&targets);
        }

        // Sources resolve globally, targets only on this rank.
        let global_sources = ctx.distributed.gather_labels(&local_sources)?;
        let source_map = LabelResolutionMap::new(&global_sources);
        let target_map = Arc::new(LabelResolutionMap::new(&local_targets));

        let communicator =
            Communicator::new(recipe, decomp, &source_map, Arc::clone(&target_map), &ctx)?;
        let num_local_cells = communicator.num_local_cells();
        let group_ranges = communicator.group_queue_ranges();
        let t_interval = communicator.min_delay() / 2.0;

        let mut gid_to_local = AHashMap::with_capacity(num_local_cells);
        let mut generators = Vec::with_capacity(num_local_cells);
        let mut lid = 0usize;
        for (group_index, group) in decomp.groups().iter().enumerate() {
            for &gid in &group.gids {
                gid_to_local.insert(
                    gid,
                    LocalCellInfo {
                        group_index,
                        cell_index: lid,
                    },
                );
                // Each generator binds its target through a resolver of its
                // own, so concurrent generators share no selection state.
                let mut gens = Vec::new();
                for spec in recipe.event_generators(gid) {
                    let mut resolver = Resolver::new(Arc::clone(&target_map));
                    gens.push(EventGenerator::from_spec(spec, gid, &mut resolver)?);
                }
                generators.push(gens);
                lid += 1;
            }
        }

        let threads = ctx.thread_count();
        info!(
            "[SIM] wired {} group(s), {} local cell(s) on rank {}/{}, t_interval={}",
            cell_groups.len(),
            num_local_cells,
            ctx.distributed.rank(),
            ctx.distributed.num_ranks(),
            t_interval
        );

        Ok(Self {
            epoch: Epoch::default(),
            t_interval,
            cell_groups,
            generators,
            gid_to_local,
            communicator,
            group_ranges,
            pending: vec![Vec::new(); num_local_cells],
            lanes: EventLaneStore::new(num_local_cells),
            local_spikes: [
                LocalSpikeStore::new(threads),
                LocalSpikeStore::new(threads),
            ],
            handles: HandleSet::new(),
            ctx,
            local_export: None,
            global_export: None,
        })
    }

    /// Advance to `tfinal` in epochs of at most `t_interval`, integrating
    /// cells with timestep `dt`. Returns the time actually reached.
    ///
    /// A `tfinal` at or before the already integrated time is a no-op. A
    /// failure from a collaborator aborts the run and leaves the state
    /// unspecified; `reset()` before reuse.
    pub fn run(&mut self, tfinal: TimeType, dt: TimeType) -> Result<TimeType> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimulationError::InvalidTimestep { dt });
        }
        if tfinal <= self.epoch.t1 {
            return Ok(self.epoch.t1);
        }
        debug!(
            "[PIPELINE] run from t={} to t={} (dt={})",
            self.epoch.t1, tfinal, dt
        );
        let pool = Arc::clone(self.ctx.pool());
        pool.install(|| self.run_epochs(tfinal, dt))
    }

    fn run_epochs(&mut self, tfinal: TimeType, dt: TimeType) -> Result<TimeType> {
        let interval = self.t_interval;
        let mut current = next_epoch(self.epoch, interval, tfinal);
        let mut next = next_epoch(current, interval, tfinal);

        if next.is_empty() {
            // One epoch to go: no overlap to exploit.
            self.seq_enqueue(current);
            self.seq_update(current, dt)?;
            self.seq_exchange(current)?;
        } else {
            self.seq_enqueue(current);
            self.parallel_enqueue_update(next, current, dt)?;

            let mut prev;
            loop {
                prev = current;
                current = next;
                next = next_epoch(next, interval, tfinal);
                if next.is_empty() {
                    break;
                }
                self.parallel_exchange_enqueue_update(prev, next, current, dt)?;
            }

            self.parallel_exchange_update(prev, current, dt)?;
            self.seq_exchange(current)?;
        }

        self.epoch = current;
        debug!(
            "[PIPELINE] resident epoch id={} covers [{}, {})",
            current.id, current.t0, current.t1
        );
        Ok(current.t1)
    }

    // --- parallel pairs ------------------------------------------------

    /// {E(next), U(current)} — valid because E writes the opposite lane bank
    /// from the one U reads.
    fn parallel_enqueue_update(&mut self, next: Epoch, current: Epoch, dt: TimeType) -> Result<()> {
        let Self {
            cell_groups,
            generators,
            pending,
            lanes,
            local_spikes,
            group_ranges,
            ..
        } = self;
        let (lane_read, lane_write) = lanes.read_write(next.id);
        let store = &local_spikes[epoch_parity(current.id)];

        let (_, upd) = rayon::join(
            || enqueue_phase(next, lane_read, lane_write, pending, generators),
            || update_phase(current, dt, cell_groups, group_ranges, lane_read, store),
        );
        upd
    }

    /// {D(prev); E(next)} on one task, U(current) on the other. D and E stay
    /// serialized because both touch the pending buffers.
    fn parallel_exchange_enqueue_update(
        &mut self,
        prev: Epoch,
        next: Epoch,
        current: Epoch,
        dt: TimeType,
    ) -> Result<()> {
        let local_cb = self.local_export.clone();
        let global_cb = self.global_export.clone();
        let Self {
            cell_groups,
            generators,
            pending,
            lanes,
            local_spikes,
            group_ranges,
            communicator,
            ..
        } = self;
        let (lane_read, lane_write) = lanes.read_write(next.id);
        let prev_store = &local_spikes[epoch_parity(prev.id)];
        let cur_store = &local_spikes[epoch_parity(current.id)];

        let (de, upd) = rayon::join(
            || -> Result<()> {
                exchange_phase(communicator, prev_store, pending, &local_cb, &global_cb)?;
                enqueue_phase(next, lane_read, lane_write, pending, generators);
                Ok(())
            },
            || update_phase(current, dt, cell_groups, group_ranges, lane_read, cur_store),
        );
        de?;
        upd
    }

    /// {D(prev), U(current)} — the loop exit pair.
    fn parallel_exchange_update(&mut self, prev: Epoch, current: Epoch, dt: TimeType) -> Result<()> {
        let local_cb = self.local_export.clone();
        let global_cb = self.global_export.clone();
        let Self {
            cell_groups,
            pending,
            lanes,
            local_spikes,
            group_ranges,
            communicator,
            ..
        } = self;
        let lane_read = lanes.bank(current.id);
        let prev_store = &local_spikes[epoch_parity(prev.id)];
        let cur_store = &local_spikes[epoch_parity(current.id)];

        let (de, upd) = rayon::join(
            || exchange_phase(communicator, prev_store, pending, &local_cb, &global_cb),
            || update_phase(current, dt, cell_groups, group_ranges, lane_read, cur_store),
        );
        de?;
        upd
    }

    // --- sequential phase entry points ---------------------------------

    fn seq_enqueue(&mut self, epoch: Epoch) {
        let Self {
            generators,
            pending,
            lanes,
            ..
        } = self;
        let (lane_read, lane_write) = lanes.read_write(epoch.id);
        enqueue_phase(epoch, lane_read, lane_write, pending, generators);
    }

    fn seq_update(&mut self, epoch: Epoch, dt: TimeType) -> Result<()> {
        let Self {
            cell_groups,
            group_ranges,
            lanes,
            local_spikes,
            ..
        } = self;
        update_phase(
            epoch,
            dt,
            cell_groups,
            group_ranges,
            lanes.bank(epoch.id),
            &local_spikes[epoch_parity(epoch.id)],
        )
    }

    fn seq_exchange(&mut self, epoch: Epoch) -> Result<()> {
        let local_cb = self.local_export.clone();
        let global_cb = self.global_export.clone();
        let Self {
            communicator,
            local_spikes,
            pending,
            ..
        } = self;
        exchange_phase(
            communicator,
            &local_spikes[epoch_parity(epoch.id)],
            pending,
            &local_cb,
            &global_cb,
        )
    }

    // --- public surface -------------------------------------------------

    /// Rewind everything to time zero: epoch clock, groups, lanes,
    /// generators, pending buffers, communicator counter and spike stores.
    pub fn reset(&mut self) {
        self.epoch.reset();
        let pool = Arc::clone(self.ctx.pool());
        pool.install(|| {
            self.cell_groups.par_iter_mut().for_each(|g| g.reset());
        });
        self.lanes.reset();
        for gens in &mut self.generators {
            gens.iter_mut().for_each(EventGenerator::reset);
        }
        for lane in &mut self.pending {
            lane.clear();
        }
        self.communicator.reset();
        for store in &self.local_spikes {
            store.clear();
        }
        debug!("[SIM] state rewound to t=0");
    }

    /// Total spikes seen by the exchange since construction or reset.
    pub fn num_spikes(&self) -> u64 {
        self.communicator.num_spikes()
    }

    /// Schedule externally produced events for future delivery.
    ///
    /// Every event must lie at or after the integrated time; a batch with any
    /// past-time event is rejected whole, leaving the pending buffers
    /// untouched. Events for gids not on this rank are skipped silently.
    pub fn inject_events(
        &mut self,
        events: &AHashMap<CellGid, Vec<PostSynapticEvent>>,
    ) -> Result<()> {
        for evs in events.values() {
            for e in evs {
                if e.time < self.epoch.t1 {
                    return Err(SimulationError::BadEventTime {
                        time: e.time,
                        t_min: self.epoch.t1,
                    });
                }
            }
        }
        for (gid, evs) in events {
            if let Some(info) = self.gid_to_local.get(gid) {
                self.pending[info.cell_index].extend_from_slice(evs);
            }
        }
        Ok(())
    }

    /// Attach a sampler to every group; returns the association handle.
    pub fn add_sampler(
        &mut self,
        probes: ProbePredicate,
        schedule: Schedule,
        callback: SamplerFn,
        policy: SamplingPolicy,
    ) -> SamplerHandle {
        let handle = self.handles.acquire();
        let pool = Arc::clone(self.ctx.pool());
        pool.install(|| {
            self.cell_groups.par_iter_mut().for_each(|g| {
                g.add_sampler(SamplerAssociation {
                    handle,
                    probes: probes.clone(),
                    schedule: schedule.clone(),
                    callback: callback.clone(),
                    policy,
                });
            });
        });
        handle
    }

    pub fn remove_sampler(&mut self, handle: SamplerHandle) {
        let pool = Arc::clone(self.ctx.pool());
        pool.install(|| {
            self.cell_groups
                .par_iter_mut()
                .for_each(|g| g.remove_sampler(handle));
        });
        self.handles.release(handle);
    }

    pub fn remove_all_samplers(&mut self) {
        let pool = Arc::clone(self.ctx.pool());
        pool.install(|| {
            self.cell_groups
                .par_iter_mut()
                .for_each(|g| g.remove_all_samplers());
        });
        self.handles.clear();
    }

    /// Metadata for a probe; empty when the gid is not on this rank or the
    /// probe is unknown to its group.
    pub fn probe_metadata(&self, probe: ProbeId) -> Vec<ProbeMetadata> {
        match self.gid_to_local.get(&probe.gid) {
            Some(info) => self.cell_groups[info.group_index].probe_metadata(probe),
            None => Vec::new(),
        }
    }

    pub fn set_binning_policy(&mut self, kind: BinningKind, interval: TimeType) {
        let pool = Arc::clone(self.ctx.pool());
        pool.install(|| {
            self.cell_groups
                .par_iter_mut()
                .for_each(|g| g.set_binning_policy(kind, interval));
        });
    }

    /// Called with this rank's spikes each epoch, before the exchange.
    pub fn set_local_spike_callback(&mut self, callback: Option<SpikeExportFn>) {
        self.local_export = callback;
    }

    /// Called with the global spike set each epoch, after the exchange.
    pub fn set_global_spike_callback(&mut self, callback: Option<SpikeExportFn>) {
        self.global_export = callback;
    }
}

// --- phase bodies -------------------------------------------------------
//
// Free functions taking exactly the state a phase touches, so the parallel
// pairs above can hand disjoint borrows of the driver to rayon::join.

/// U: clear this parity's spike store, advance every group over its lane
/// slice, collect the spikes.
fn update_phase(
    epoch: Epoch,
    dt: TimeType,
    groups: &mut [CellGroupBox],
    ranges: &[Range<usize>],
    lane_bank: &[EventLane],
    store: &LocalSpikeStore,
) -> Result<()> {
    store.clear();
    groups
        .par_iter_mut()
        .enumerate()
        .try_for_each(|(i, group)| {
            group.advance(epoch, dt, &lane_bank[ranges[i].clone()])?;
            store.insert(group.spikes());
            group.clear_spikes();
            Ok(())
        })
}

/// D: gather, exchange across ranks, export, translate into pending events.
fn exchange_phase(
    communicator: &mut Communicator,
    store: &LocalSpikeStore,
    pending: &mut [EventLane],
    local_export: &Option<SpikeExportFn>,
    global_export: &Option<SpikeExportFn>,
) -> Result<()> {
    let local = store.gather();
    let global = communicator.exchange(&local)?;

    if let Some(cb) = local_export {
        cb(&local);
    }
    if let Some(cb) = global_export {
        cb(&global);
    }

    communicator.make_event_queues(&global, pending);
    Ok(())
}

/// E: merge pending + previous lane + generator events into the new lanes,
/// one cell per task.
fn enqueue_phase(
    next: Epoch,
    lane_read: &[EventLane],
    lane_write: &mut [EventLane],
    pending: &mut [EventLane],
    generators: &mut [Vec<EventGenerator>],
) {
    lane_write
        .par_iter_mut()
        .zip(lane_read.par_iter())
        .zip(pending.par_iter_mut())
        .zip(generators.par_iter_mut())
        .for_each(|(((out, old), pend), gens)| {
            // Exchange appends in spike order; injected events arrive
            // unsorted on top of that.
            pend.sort();
            merge_cell_events(next.t0, next.t1, old, pend, gens, out);
            pend.clear();
        });
}
