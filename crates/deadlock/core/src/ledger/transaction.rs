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

//! Speculative grants
//!
//! A grant moves units from the free pool to one process. `revert` is the
//! exact arithmetic inverse of `apply`, so a denied request leaves the ledger
//! bit-identical to its prior state. Releasing units back is the same
//! movement in the other direction.

use super::vector::ResourceVector;

/// Movement of units from the free pool to one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDelta {
    process: usize,
    amounts: ResourceVector,
}

impl RequestDelta {
    pub fn new(process: usize, amounts: ResourceVector) -> Self {
        Self { process, amounts }
    }

    pub fn process(&self) -> usize {
        self.process
    }

    pub fn amounts(&self) -> &ResourceVector {
        &self.amounts
    }

    /// `available -= amounts`, `allocation += amounts`, `need -= amounts`.
    ///
    /// Requires `amounts <= available` and `amounts <= need`.
    pub fn apply(&self, available: &mut ResourceVector, allocation: &mut ResourceVector, need: &mut ResourceVector) {
        available.sub_assign(&self.amounts);
        allocation.add_assign(&self.amounts);
        need.sub_assign(&self.amounts);
    }

    /// `available += amounts`, `allocation -= amounts`, `need += amounts`.
    ///
    /// Requires `amounts <= allocation`.
    pub fn revert(&self, available: &mut ResourceVector, allocation: &mut ResourceVector, need: &mut ResourceVector) {
        available.add_assign(&self.amounts);
        allocation.sub_assign(&self.amounts);
        need.add_assign(&self.amounts);
    }
}
