// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the simulation core

use synfire_neural::{CellGid, TimeType};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SimulationError {
    #[error("integration timestep must be finite and positive, got dt={dt}")]
    InvalidTimestep { dt: TimeType },

    #[error("event at t={time} lies before the end of integrated history t={t_min}; events must be scheduled in the future")]
    BadEventTime { time: TimeType, t_min: TimeType },

    #[error("network minimum delay must be positive, got {min_delay}")]
    NonPositiveMinDelay { min_delay: TimeType },

    #[error("no target range named {label:?} on {gid}")]
    UnknownLabel { gid: CellGid, label: String },

    #[error("label {label:?} on {gid} resolves to {count} targets but exactly one was required")]
    NonUnivalentLabel {
        gid: CellGid,
        label: String,
        count: u32,
    },

    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

pub type Result<T> = core::result::Result<T, SimulationError>;
