// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event generators
//!
//! A generator turns a [`Schedule`] into weighted post-synaptic events aimed
//! at one labelled target on its cell. Target labels are resolved exactly
//! once at construction; each generator gets a resolver of its own so
//! concurrent generators never share selection state.

use synfire_neural::{CellGid, PostSynapticEvent, TimeType};

use crate::error::Result;
use crate::labels::{Resolver, SelectionPolicy};
use crate::schedule::Schedule;

/// Recipe-side description of a generator, before target resolution.
#[derive(Debug, Clone)]
pub struct EventGeneratorSpec {
    pub target_label: String,
    pub policy: SelectionPolicy,
    pub weight: f32,
    pub schedule: Schedule,
}

/// A resolved generator bound to a concrete target index on its cell.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    target: u32,
    weight: f32,
    schedule: Schedule,
}

impl EventGenerator {
    /// Bind `spec` to a target on `gid` through `resolver`.
    pub fn from_spec(spec: EventGeneratorSpec, gid: CellGid, resolver: &mut Resolver) -> Result<Self> {
        let target = resolver.resolve(gid, &spec.target_label, spec.policy)?;
        Ok(Self {
            target,
            weight: spec.weight,
            schedule: spec.schedule,
        })
    }

    /// Events in `[t_from, t_to)`, sorted by time.
    pub fn events(&mut self, t_from: TimeType, t_to: TimeType) -> Vec<PostSynapticEvent> {
        self.schedule
            .events(t_from, t_to)
            .into_iter()
            .map(|t| PostSynapticEvent::new(self.target, self.weight, t))
            .collect()
    }

    pub fn reset(&mut self) {
        self.schedule.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::labels::{LabelResolutionMap, LabelTable};

    fn resolver() -> Resolver {
        let mut t = LabelTable::new();
        t.add_cell(CellGid(3), &[("syn", 2)]);
        Resolver::new(Arc::new(LabelResolutionMap::new(&t)))
    }

    #[test]
    fn test_generator_emits_weighted_events_at_schedule_times() {
        let spec = EventGeneratorSpec {
            target_label: "syn".into(),
            policy: SelectionPolicy::RoundRobin,
            weight: 0.25,
            schedule: Schedule::explicit(vec![0.5, 1.5]),
        };
        let mut g = EventGenerator::from_spec(spec, CellGid(3), &mut resolver()).unwrap();

        let evs = g.events(0.0, 1.0);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].target, 0);
        assert_eq!(evs[0].weight, 0.25);
        assert_eq!(evs[0].time, 0.5);

        assert_eq!(g.events(1.0, 2.0).len(), 1);
    }

    #[test]
    fn test_unknown_target_fails_at_bind_time() {
        let spec = EventGeneratorSpec {
            target_label: "nope".into(),
            policy: SelectionPolicy::Univalent,
            weight: 1.0,
            schedule: Schedule::regular(0.0, 1.0),
        };
        assert!(EventGenerator::from_spec(spec, CellGid(3), &mut resolver()).is_err());
    }
}
