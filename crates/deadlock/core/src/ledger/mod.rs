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

// Deadlock Avoidance Module
// Resource ledger, safety simulation and a thread-safe arbiter

pub mod arbiter;
pub mod resource_ledger;
pub mod safety;
pub mod transaction;
pub mod vector;

// Public exports
pub use arbiter::{ArbiterStatistics, LastOutcome, ResourceArbiter};
pub use resource_ledger::{Grant, LedgerSnapshot, ResourceLedger};
pub use safety::{SafetyReport, SafetySimulator, Simulation};
pub use transaction::RequestDelta;
pub use vector::{Matrix, ResourceVector};
