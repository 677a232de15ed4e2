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

// Deadlock Detection Module
// Resource allocation graph, cycle enumeration, reduction and a thread-safe detector

pub mod cycles;
pub mod detector;
pub mod rag;
pub mod reduction;
pub mod types;

// Public exports
pub use cycles::simple_cycles;
pub use detector::{DeadlockDetector, DeadlockReport, DetectionStatistics};
pub use rag::{GraphSnapshot, ResourceAllocationGraph};
pub use reduction::{Reduction, reduce};
pub use types::{Cycle, Edge, EdgeKind, NodeId, ProcessId, ResourceId, ResourceInfo};
