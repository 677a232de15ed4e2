// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Configuration for the ledger, the deadlock detector and the memory allocator

use serde::{Deserialize, Serialize};

/// Order in which the safety algorithm scans unfinished processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyScan {
    /// Restart from process 0 after every finish, so the lowest finishable
    /// index always wins
    #[default]
    LowestIndexFirst,
    /// Continue with the next index after a finish, wrapping around
    RoundRobin,
}

/// Resource ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Scan order used by the safety algorithm
    pub scan: SafetyScan,
}

/// How the detector decides whether a graph is deadlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Any alternating cycle is a deadlock. Only sound when every resource
    /// has a single instance.
    CycleSearch,
    /// Graph reduction: simulate processes whose requests can be met
    /// releasing their holdings; whatever never finishes is deadlocked.
    Reduction,
    /// Cycle search when all resources are single-instance, reduction otherwise
    #[default]
    Auto,
}

/// Deadlock detector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detection strategy
    pub strategy: DetectionStrategy,
    /// Maximum number of cycles to report. Does not affect the verdict.
    pub max_cycles: Option<usize>,
    /// Register unknown processes and resources on first edge use
    pub auto_register: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::Auto,
            max_cycles: None,
            auto_register: false,
        }
    }
}

/// Placement policy for contiguous memory allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStrategy {
    /// First free block large enough, in address order
    #[default]
    FirstFit,
    /// Smallest free block large enough; lowest address on ties
    BestFit,
    /// Largest free block; lowest address on ties
    WorstFit,
}

/// Memory allocator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Total memory in units
    pub memory_size: u64,
    /// Placement policy
    pub strategy: FitStrategy,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            memory_size: 1000,
            strategy: FitStrategy::FirstFit,
        }
    }
}
