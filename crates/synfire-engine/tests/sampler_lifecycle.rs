// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sampler lifecycle across groups: attach, detach, handle reuse.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use synfire_engine::groups::lif::LifParameters;
use synfire_engine::{
    CellDescription, CellGid, CellKind, DomainDecomposition, ExecutionContext, Recipe, Sample,
    SamplingPolicy, Schedule, Simulation,
};

struct LifOnly(usize);

impl Recipe for LifOnly {
    fn num_cells(&self) -> usize {
        self.0
    }
    fn cell_kind(&self, _gid: CellGid) -> CellKind {
        CellKind::Lif
    }
    fn cell_description(&self, _gid: CellGid) -> CellDescription {
        CellDescription::Lif(LifParameters::default())
    }
}

fn build(cells: usize) -> Simulation {
    let recipe = LifOnly(cells);
    let decomp = DomainDecomposition::partition(&recipe);
    let ctx = ExecutionContext::with_threads(2).unwrap();
    Simulation::new(&recipe, &decomp, ctx).unwrap()
}

type CallCounts = Arc<Mutex<AHashMap<usize, usize>>>;

fn counting_sampler(sim: &mut Simulation, marker: usize, counts: &CallCounts) -> synfire_engine::SamplerHandle {
    let sink = Arc::clone(counts);
    sim.add_sampler(
        Arc::new(|_| true),
        Schedule::regular(0.0, 0.5),
        Arc::new(move |_, batch: &[Sample]| {
            *sink.lock().entry(marker).or_insert(0) += batch.len();
        }),
        SamplingPolicy::Lax,
    )
}

#[test]
fn test_removed_sampler_goes_quiet_and_its_handle_is_reissued() {
    let mut sim = build(3);
    let counts: CallCounts = Arc::new(Mutex::new(AHashMap::new()));

    let h0 = counting_sampler(&mut sim, 0, &counts);
    let h1 = counting_sampler(&mut sim, 1, &counts);
    let h2 = counting_sampler(&mut sim, 2, &counts);
    assert!(h0 != h1 && h1 != h2);

    sim.remove_sampler(h1);
    sim.run(2.0, 0.1).unwrap();

    {
        let counts = counts.lock();
        assert!(counts.get(&0).copied().unwrap_or(0) > 0);
        assert_eq!(counts.get(&1).copied().unwrap_or(0), 0);
        assert!(counts.get(&2).copied().unwrap_or(0) > 0);
    }

    // The freed handle value may come straight back.
    let h3 = counting_sampler(&mut sim, 3, &counts);
    assert_eq!(h3, h1);
}

#[test]
fn test_remove_all_samplers_resets_the_handle_space() {
    let mut sim = build(2);
    let counts: CallCounts = Arc::new(Mutex::new(AHashMap::new()));

    let first = counting_sampler(&mut sim, 0, &counts);
    let _ = counting_sampler(&mut sim, 1, &counts);
    sim.remove_all_samplers();

    sim.run(1.0, 0.1).unwrap();
    assert!(counts.lock().is_empty());

    // Handle allocation starts over from the initial state.
    let fresh = counting_sampler(&mut sim, 2, &counts);
    assert_eq!(fresh, first);
}
