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

//! Contiguous memory blocks

use std::fmt;

use serde::Serialize;

/// A contiguous range of memory, free or held by one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryBlock {
    /// First address of the block
    pub start: u64,
    /// Length in units, never zero
    pub size: u64,
    /// Process holding the block; `None` when free
    pub owner: Option<String>,
}

impl MemoryBlock {
    /// A free block
    pub fn free(start: u64, size: u64) -> Self {
        Self { start, size, owner: None }
    }

    /// Last address of the block (inclusive)
    pub fn end(&self) -> u64 {
        self.start + self.size.saturating_sub(1)
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_held_by(&self, owner: &str) -> bool {
        self.owner.as_deref() == Some(owner)
    }
}

impl fmt::Display for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block[{}-{}] Size: {} - ", self.start, self.end(), self.size)?;
        match &self.owner {
            Some(owner) => write!(f, "Allocated to {owner}"),
            None => write!(f, "Free"),
        }
    }
}
