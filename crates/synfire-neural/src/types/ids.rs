// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity types for cells

use core::fmt;

use serde::{Deserialize, Serialize};

/// Global cell ID (unique across every rank of the simulation)
///
/// Gids are opaque: dense enumeration is not required anywhere in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellGid(pub u32);

impl fmt::Display for CellGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell({})", self.0)
    }
}
