// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event lane assembly
//!
//! Builds a cell's event lane for one epoch out of three kinds of sorted
//! input: events left on the previous lane, events delivered by the last
//! exchange, and events produced by the cell's generators for the epoch
//! window. Equal-time events keep a fixed relative order: old lane first,
//! then pending, then generators in ascending index — that rule plus sorted
//! inputs makes lane contents reproducible run over run.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use synfire_neural::{PostSynapticEvent, TimeType};

use crate::event_lanes::EventLane;
use crate::generator::EventGenerator;

/// Build `out` from the cell's inputs for the window `[t_from, t_to)`.
///
/// Events on `old_events` before `t_from` were consumed in the previous epoch
/// and are dropped. Events at or past `t_to` (from old or pending) are kept
/// at the tail of `out`; the next epoch's call filters them again. With S
/// input streams and N surviving events this runs in O(N log S).
pub fn merge_cell_events(
    t_from: TimeType,
    t_to: TimeType,
    old_events: &[PostSynapticEvent],
    pending: &[PostSynapticEvent],
    generators: &mut [EventGenerator],
    out: &mut EventLane,
) {
    out.clear();

    let old_events = &old_events[split_at_time(old_events, t_from)..];

    if generators.is_empty() {
        two_way_merge(old_events, pending, out);
        return;
    }

    // Tree-merge events in [t_from, t_to) from old, pending and generators.
    let (old_in, old_tail) = old_events.split_at(split_at_time(old_events, t_to));
    let (pending_in, pending_tail) = pending.split_at(split_at_time(pending, t_to));

    let generated: Vec<Vec<PostSynapticEvent>> = generators
        .iter_mut()
        .map(|g| g.events(t_from, t_to))
        .collect();

    let mut streams = Vec::with_capacity(2 + generated.len());
    streams.push(old_in);
    streams.push(pending_in);
    for evs in &generated {
        if !evs.is_empty() {
            streams.push(evs.as_slice());
        }
    }
    tree_merge(&streams, out);

    // Merge the remaining (>= t_to) old and pending events onto the tail.
    two_way_merge(old_tail, pending_tail, out);
}

/// Index of the first event with `time >= t`.
fn split_at_time(events: &[PostSynapticEvent], t: TimeType) -> usize {
    events.partition_point(|e| e.time < t)
}

/// Stable two-way merge appending to `out`; ties take from `a` first.
fn two_way_merge(a: &[PostSynapticEvent], b: &[PostSynapticEvent], out: &mut EventLane) {
    out.reserve(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if b[j] < a[i] {
            out.push(b[j]);
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

struct HeapEntry {
    event: PostSynapticEvent,
    stream: usize,
    pos: usize,
}

// Min-first ordering on (event, stream): BinaryHeap is a max-heap, so the
// comparison is reversed here rather than wrapping every entry in Reverse.
impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .cmp(&self.event)
            .then_with(|| other.stream.cmp(&self.stream))
    }
}

/// K-way merge of sorted streams. Equal events pop in ascending stream order,
/// which realises the old < pending < generator tie-break through the order
/// the caller lists the streams in.
fn tree_merge(streams: &[&[PostSynapticEvent]], out: &mut EventLane) {
    out.reserve(streams.iter().map(|s| s.len()).sum());

    let mut heap: BinaryHeap<HeapEntry> = streams
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .map(|(stream, s)| HeapEntry {
            event: s[0],
            stream,
            pos: 0,
        })
        .collect();

    while let Some(entry) = heap.pop() {
        out.push(entry.event);
        let next = entry.pos + 1;
        let stream = streams[entry.stream];
        if next < stream.len() {
            heap.push(HeapEntry {
                event: stream[next],
                stream: entry.stream,
                pos: next,
            });
        }
    }
}
