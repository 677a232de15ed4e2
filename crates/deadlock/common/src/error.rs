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

//! Error types shared by the resource ledger, the allocation graph and the
//! memory allocator.
//!
//! Every error is recoverable: the structure that returned it is left exactly
//! as it was before the failing call.

/// Errors raised by the resource ledger (Banker's Algorithm)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch { expected: (usize, usize), found: (usize, usize) },

    #[error("Unknown process {0}")]
    UnknownProcess(usize),

    #[error("Process {process} requested more than its declared need")]
    ExceedsNeed { process: usize },

    #[error("Process {process} must wait: resources not available")]
    InsufficientAvailable { process: usize },

    #[error("Request of process {process} denied: granting would lead to an unsafe state")]
    WouldBeUnsafe { process: usize },

    #[error("Process {process} released more than it holds")]
    ExceedsAllocation { process: usize },

    #[error("Allocation of process {process} exceeds its maximum claim")]
    AllocationExceedsClaim { process: usize },

    #[error("Units of resource type {resource} in circulation overflow a 32-bit count")]
    TotalOverflow { resource: usize },
}

impl LedgerError {
    /// Whether the caller may retry the same request later unchanged.
    ///
    /// Only a shortage of available units is transient; every other error
    /// reflects a request that can never be granted from the current claims.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::InsufficientAvailable { .. })
    }

    /// Process the error refers to, if any
    pub fn process(&self) -> Option<usize> {
        match self {
            LedgerError::DimensionMismatch { .. } | LedgerError::TotalOverflow { .. } => None,
            LedgerError::UnknownProcess(process)
            | LedgerError::ExceedsNeed { process }
            | LedgerError::InsufficientAvailable { process }
            | LedgerError::WouldBeUnsafe { process }
            | LedgerError::ExceedsAllocation { process }
            | LedgerError::AllocationExceedsClaim { process } => Some(*process),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors raised while building or mutating a resource allocation graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Entity {0} is already registered")]
    DuplicateEntity(String),

    #[error("Entity {0} is not registered")]
    UnknownEntity(String),

    #[error("Invalid instance count {count} for resource {resource}")]
    InvalidInstanceCount { resource: String, count: i64 },

    #[error("All {instances} instances of resource {resource} are allocated")]
    InstancesExhausted { resource: String, instances: u32 },
}

/// Result type for graph operations
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors raised by the contiguous memory allocator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("Memory size must be at least one unit")]
    InvalidMemorySize,

    #[error("Process {0} requested zero units")]
    ZeroSizedRequest(String),

    #[error("No free block can hold {requested} units for process {owner} (largest free block: {largest_free})")]
    OutOfMemory { owner: String, requested: u64, largest_free: u64 },

    #[error("Process {0} holds no memory")]
    UnknownOwner(String),
}

impl MemoryError {
    /// Whether the request may succeed later, once memory is released
    pub fn is_retryable(&self) -> bool {
        matches!(self, MemoryError::OutOfMemory { .. })
    }
}

/// Result type for memory allocator operations
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;
