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

//! Deadlock avoidance, deadlock detection and memory allocation
//!
//! Three independent engines over in-memory resource models:
//!
//! - [`ledger`]: Banker's Algorithm. A [`ResourceLedger`] tracks available,
//!   maximum claim, allocation and need, and grants a request only if the
//!   resulting state is safe. [`ResourceArbiter`] serializes access for
//!   multiple threads.
//! - [`graph`]: a [`ResourceAllocationGraph`] of request and allocation edges
//!   with cycle-based deadlock detection, plus a [`DeadlockDetector`] that can
//!   also reduce graphs with multi-instance resources.
//! - [`memory`]: a contiguous [`MemoryAllocator`] with first, best and worst
//!   fit placement, merging of freed neighbours and fragmentation read-outs.
//!
//! No engine blocks, persists state or owns global state.

pub mod graph;
pub mod ledger;
pub mod memory;

pub use deadlock_common::{
    AllocatorConfig, DetectionStrategy, DetectorConfig, FitStrategy, GraphError, GraphResult, LedgerConfig, LedgerError, LedgerResult, MemoryError,
    MemoryResult, SafetyScan,
};
pub use graph::{Cycle, DeadlockDetector, DeadlockReport, Edge, EdgeKind, NodeId, ProcessId, ResourceAllocationGraph, ResourceId};
pub use ledger::{Grant, ResourceArbiter, ResourceLedger, SafetyReport};
pub use memory::{MemoryAllocator, MemoryBlock, MemoryStatistics};
