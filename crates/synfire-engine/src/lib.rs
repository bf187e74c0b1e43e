// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Synfire Engine
//!
//! Epoch-pipelined simulation core for distributed spiking networks.
//!
//! ## Architecture
//! - Fixed-length integration epochs bounded by half the network minimum
//!   delay, which is what makes cross-rank spike delivery causal.
//! - Update / Exchange / Enqueue phases overlapped on one rayon pool.
//! - Event lanes and spike stores double buffered by epoch parity; no locks
//!   on the epoch-level hot path.
//! - Rank communication behind the [`context::Distributed`] collective.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cell_group;
pub mod communicator;
pub mod context;
pub mod error;
pub mod event_lanes;
pub mod generator;
pub mod groups;
pub mod labels;
pub mod merge_events;
pub mod recipe;
pub mod sampler;
pub mod schedule;
pub mod simulation;
pub mod spike_store;

pub use cell_group::{cell_group_factory, CellGroup, CellGroupBox, GroupFactory};
pub use communicator::Communicator;
pub use context::{Distributed, ExecutionContext, LocalDistributed};
pub use error::{Result, SimulationError};
pub use event_lanes::{EventLane, EventLaneStore};
pub use generator::{EventGenerator, EventGeneratorSpec};
pub use labels::{LabelResolutionMap, LabelTable, Resolver, SelectionPolicy};
pub use merge_events::merge_cell_events;
pub use recipe::{
    Backend, CellDescription, CellKind, ConnectionSpec, DomainDecomposition, GroupDescription,
    Recipe,
};
pub use sampler::{
    BinningKind, HandleSet, ProbeId, ProbeMetadata, ProbePredicate, Sample, SamplerAssociation,
    SamplerFn, SamplerHandle, SamplingPolicy,
};
pub use schedule::Schedule;
pub use simulation::{LocalCellInfo, Simulation, SpikeExportFn};
pub use spike_store::LocalSpikeStore;

// Re-export the value types so downstream users need only this crate.
pub use synfire_neural::{CellGid, Epoch, PostSynapticEvent, Spike, TimeType};
