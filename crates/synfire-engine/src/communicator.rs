// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Spike Exchange
//!
//! The communicator owns the rank boundary: it gathers locally generated
//! spikes across every rank and translates the global spike set back into
//! per-cell pending events by walking a connection table.
//!
//! The table is built once at construction and kept sorted by source gid, so
//! translating a spike is a binary search plus a linear scan over that
//! source's connections.

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, trace};

use synfire_neural::{CellGid, PostSynapticEvent, Spike, TimeType, TIME_MAX};

use crate::context::{Distributed, ExecutionContext};
use crate::error::{Result, SimulationError};
use crate::event_lanes::EventLane;
use crate::labels::{LabelResolutionMap, Resolver, SelectionPolicy};
use crate::recipe::{DomainDecomposition, Recipe};

#[derive(Debug, Clone)]
struct Connection {
    source: CellGid,
    /// Rank-local index of the receiving cell (its lane slot).
    target_lid: u32,
    /// Target index on the receiving cell.
    dest: u32,
    weight: f32,
    delay: TimeType,
}

pub struct Communicator {
    num_local_cells: usize,
    group_ranges: Vec<Range<usize>>,
    /// Sorted by source gid; ties keep recipe declaration order.
    connections: Vec<Connection>,
    min_delay: TimeType,
    num_spikes: u64,
    distributed: Arc<dyn Distributed>,
}

impl Communicator {
    /// Build the connection table for this rank's cells.
    ///
    /// Source endpoints are validated against the globally gathered source
    /// map; destination labels resolve through the local target map with
    /// round-robin selection. Every delay must be positive; the network
    /// minimum is reduced across ranks. A rank with no connections
    /// contributes an infinite local minimum.
    pub fn new(
        recipe: &dyn Recipe,
        decomp: &DomainDecomposition,
        source_map: &LabelResolutionMap,
        target_map: Arc<LabelResolutionMap>,
        ctx: &ExecutionContext,
    ) -> Result<Self> {
        let mut group_ranges = Vec::with_capacity(decomp.num_groups());
        let mut connections = Vec::new();
        let mut resolver = Resolver::new(target_map);
        let mut min_delay = TIME_MAX;

        let mut lid = 0u32;
        for group in decomp.groups() {
            let begin = lid as usize;
            for &gid in &group.gids {
                for spec in recipe.connections_on(gid) {
                    if !source_map.contains(spec.source_gid, &spec.source_label) {
                        return Err(SimulationError::UnknownLabel {
                            gid: spec.source_gid,
                            label: spec.source_label,
                        });
                    }
                    if spec.delay <= 0.0 {
                        return Err(SimulationError::NonPositiveMinDelay {
                            min_delay: spec.delay,
                        });
                    }
                    let dest =
                        resolver.resolve(gid, &spec.dest_label, SelectionPolicy::RoundRobin)?;
                    min_delay = TimeType::min(min_delay, spec.delay);
                    connections.push(Connection {
                        source: spec.source_gid,
                        target_lid: lid,
                        dest,
                        weight: spec.weight,
                        delay: spec.delay,
                    });
                }
                lid += 1;
            }
            group_ranges.push(begin..lid as usize);
        }

        connections.sort_by_key(|c| c.source);
        let min_delay = ctx.distributed.min_time(min_delay)?;
        if min_delay <= 0.0 {
            return Err(SimulationError::NonPositiveMinDelay { min_delay });
        }

        debug!(
            "[EXCHANGE] connection table ready: {} connections, min_delay={}",
            connections.len(),
            min_delay
        );

        Ok(Self {
            num_local_cells: lid as usize,
            group_ranges,
            connections,
            min_delay,
            num_spikes: 0,
            distributed: Arc::clone(&ctx.distributed),
        })
    }

    /// Smallest synaptic delay anywhere in the network. Half of this bounds
    /// the epoch length.
    pub fn min_delay(&self) -> TimeType {
        self.min_delay
    }

    pub fn num_local_cells(&self) -> usize {
        self.num_local_cells
    }

    /// Lane index range owned by group `i`.
    pub fn group_queue_range(&self, i: usize) -> Range<usize> {
        self.group_ranges[i].clone()
    }

    pub fn group_queue_ranges(&self) -> Vec<Range<usize>> {
        self.group_ranges.clone()
    }

    /// All-gather this epoch's local spikes; the returned set covers every
    /// rank. The cumulative spike counter advances by the global count so
    /// each rank reports the same total.
    pub fn exchange(&mut self, local: &[Spike]) -> Result<Vec<Spike>> {
        let global = self.distributed.gather_spikes(local)?;
        self.num_spikes += global.len() as u64;
        trace!(
            "[EXCHANGE] {} local spikes in, {} global spikes out",
            local.len(),
            global.len()
        );
        Ok(global)
    }

    /// Translate global spikes into pending events on this rank's cells.
    pub fn make_event_queues(&self, global: &[Spike], pending: &mut [EventLane]) {
        for spike in global {
            let lo = self
                .connections
                .partition_point(|c| c.source < spike.source);
            for conn in self.connections[lo..]
                .iter()
                .take_while(|c| c.source == spike.source)
            {
                pending[conn.target_lid as usize].push(PostSynapticEvent::new(
                    conn.dest,
                    conn.weight,
                    spike.time + conn.delay,
                ));
            }
        }
    }

    /// Spikes seen by every exchange since construction or the last reset.
    pub fn num_spikes(&self) -> u64 {
        self.num_spikes
    }

    pub fn reset(&mut self) {
        self.num_spikes = 0;
    }
}
