// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Label ranges and resolution
//!
//! Cells export named ranges of sources (spike detectors) and targets
//! (synapses). Connection endpoints and event generators address those items
//! by `(gid, label)`; a [`LabelResolutionMap`] turns that address into
//! concrete item indices on the cell. Source tables are gathered across ranks
//! at construction, target tables stay rank-local.

use std::ops::Range;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use synfire_neural::CellGid;

use crate::error::{Result, SimulationError};

/// One labelled, half-open range of item indices on a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub gid: CellGid,
    pub label: String,
    pub begin: u32,
    pub end: u32,
}

/// Append-only table of labelled ranges, one block per cell.
///
/// Group factories fill one table per group; the simulation concatenates them
/// in group order and (for sources) gathers the result across ranks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelTable {
    entries: Vec<LabelEntry>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cell's labelled items. Ranges are assigned consecutively in
    /// the order given, starting at index 0 on the cell.
    pub fn add_cell(&mut self, gid: CellGid, labels: &[(&str, u32)]) {
        let mut next = 0u32;
        for (label, count) in labels {
            self.entries.push(LabelEntry {
                gid,
                label: (*label).to_owned(),
                begin: next,
                end: next + count,
            });
            next += count;
        }
    }

    pub fn append(&mut self, other: &LabelTable) {
        self.entries.extend_from_slice(&other.entries);
    }

    pub fn entries(&self) -> &[LabelEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable lookup from `(gid, label)` to the item index ranges it names.
#[derive(Debug, Default)]
pub struct LabelResolutionMap {
    map: AHashMap<CellGid, AHashMap<String, Vec<Range<u32>>>>,
}

impl LabelResolutionMap {
    pub fn new(table: &LabelTable) -> Self {
        let mut map: AHashMap<CellGid, AHashMap<String, Vec<Range<u32>>>> = AHashMap::new();
        for entry in table.entries() {
            map.entry(entry.gid)
                .or_default()
                .entry(entry.label.clone())
                .or_default()
                .push(entry.begin..entry.end);
        }
        Self { map }
    }

    fn ranges(&self, gid: CellGid, label: &str) -> Option<&[Range<u32>]> {
        self.map.get(&gid)?.get(label).map(Vec::as_slice)
    }

    /// Total number of items `(gid, label)` names; 0 when unknown.
    pub fn count(&self, gid: CellGid, label: &str) -> u32 {
        self.ranges(gid, label)
            .map(|rs| rs.iter().map(|r| r.end - r.start).sum())
            .unwrap_or(0)
    }

    pub fn contains(&self, gid: CellGid, label: &str) -> bool {
        self.count(gid, label) > 0
    }

    /// The `k`-th item index across the concatenated ranges.
    fn select(&self, gid: CellGid, label: &str, k: u32) -> Option<u32> {
        let mut k = k;
        for r in self.ranges(gid, label)? {
            let len = r.end - r.start;
            if k < len {
                return Some(r.start + k);
            }
            k -= len;
        }
        None
    }
}

/// How a multivalent label collapses to a single item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The label must name exactly one item.
    Univalent,
    /// Successive resolutions cycle through the items in order.
    RoundRobin,
}

/// Stateful resolver over a shared [`LabelResolutionMap`].
///
/// Round-robin cursors live in the resolver, not the map, so every consumer
/// that needs independent selection state (each event generator, the
/// connection builder) constructs its own resolver over the same shared map.
pub struct Resolver {
    map: Arc<LabelResolutionMap>,
    cursors: AHashMap<(CellGid, String), u32>,
}

impl Resolver {
    pub fn new(map: Arc<LabelResolutionMap>) -> Self {
        Self {
            map,
            cursors: AHashMap::new(),
        }
    }

    pub fn resolve(&mut self, gid: CellGid, label: &str, policy: SelectionPolicy) -> Result<u32> {
        let count = self.map.count(gid, label);
        if count == 0 {
            return Err(SimulationError::UnknownLabel {
                gid,
                label: label.to_owned(),
            });
        }
        let k = match policy {
            SelectionPolicy::Univalent => {
                if count != 1 {
                    return Err(SimulationError::NonUnivalentLabel {
                        gid,
                        label: label.to_owned(),
                        count,
                    });
                }
                0
            }
            SelectionPolicy::RoundRobin => {
                let cursor = self.cursors.entry((gid, label.to_owned())).or_insert(0);
                let k = *cursor % count;
                *cursor += 1;
                k
            }
        };
        // count > 0 and k < count, so selection cannot fail.
        self.map.select(gid, label, k).ok_or_else(|| {
            SimulationError::UnknownLabel {
                gid,
                label: label.to_owned(),
            }
        })
    }
}
