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

//! Resource ledger for deadlock avoidance (Banker's Algorithm)
//!
//! The ledger tracks, for N processes and M resource types, the free units,
//! each process's maximum claim, its current allocation and the derived need
//! (`max_claim - allocation`). Requests are granted only if the state after
//! the grant is still safe.

use std::fmt;

use deadlock_common::{LedgerConfig, LedgerError, LedgerResult};
use serde::Serialize;
use tracing::{debug, warn};

use super::safety::{SafetyReport, SafetySimulator};
use super::transaction::RequestDelta;
use super::vector::{Matrix, ResourceVector};

/// A granted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    /// Process the units were granted to
    pub process: usize,
    /// Safe sequence witnessing the post-grant state
    pub safe_sequence: Vec<usize>,
}

/// Read-only copy of the ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub available: ResourceVector,
    pub max_claim: Matrix,
    pub allocation: Matrix,
    pub need: Matrix,
    /// Units in circulation per resource type (`available + sum(allocation)`)
    pub totals: Vec<u64>,
}

/// Banker's Algorithm state for a fixed number of processes and resource types
#[derive(Debug, Clone)]
pub struct ResourceLedger {
    processes: usize,
    resources: usize,
    simulator: SafetySimulator,
    available: ResourceVector,
    max_claim: Matrix,
    allocation: Matrix,
    need: Matrix,
}

impl ResourceLedger {
    /// Create a ledger with all counts zero
    pub fn new(processes: usize, resources: usize) -> Self {
        Self::with_config(processes, resources, LedgerConfig::default())
    }

    /// Create a ledger with a custom configuration
    pub fn with_config(processes: usize, resources: usize, config: LedgerConfig) -> Self {
        Self {
            processes,
            resources,
            simulator: SafetySimulator::new(config.scan),
            available: ResourceVector::zeros(resources),
            max_claim: Matrix::zeros(processes, resources),
            allocation: Matrix::zeros(processes, resources),
            need: Matrix::zeros(processes, resources),
        }
    }

    /// Number of processes and resource types
    pub fn dimensions(&self) -> (usize, usize) {
        (self.processes, self.resources)
    }

    /// Replace the free units
    pub fn set_available(&mut self, available: Vec<u32>) -> LedgerResult<()> {
        let available = self.check_vector(&available)?;
        check_totals(&available, &self.allocation)?;
        self.available = available;
        debug!(available = %self.available, "Available resources set");
        Ok(())
    }

    /// Replace the maximum claims and re-derive need.
    ///
    /// Fails with `AllocationExceedsClaim` if a current allocation would
    /// exceed the new claim.
    pub fn set_max_claim(&mut self, max_claim: Vec<Vec<u32>>) -> LedgerResult<()> {
        let max_claim = self.check_matrix(max_claim)?;
        let need = max_claim.checked_sub(&self.allocation).map_err(|process| LedgerError::AllocationExceedsClaim { process })?;
        self.max_claim = max_claim;
        self.need = need;
        debug!(processes = self.processes, resources = self.resources, "Maximum claims set");
        Ok(())
    }

    /// Replace the allocations and re-derive need.
    ///
    /// Maximum claims must already be in place: an allocation above the claim
    /// fails with `AllocationExceedsClaim`. Both this and `set_available` fail
    /// with `TotalOverflow` when `available + sum(allocation)` of a resource
    /// type no longer fits in `u32`, so releases can never overflow.
    pub fn set_allocation(&mut self, allocation: Vec<Vec<u32>>) -> LedgerResult<()> {
        let allocation = self.check_matrix(allocation)?;
        let need = self.max_claim.checked_sub(&allocation).map_err(|process| LedgerError::AllocationExceedsClaim { process })?;
        check_totals(&self.available, &allocation)?;
        self.allocation = allocation;
        self.need = need;
        debug!(processes = self.processes, resources = self.resources, "Allocations set");
        Ok(())
    }

    /// Run the safety algorithm on the current state
    pub fn is_safe(&self) -> SafetyReport {
        let report = self.simulator.check(&self.available, &self.need, &self.allocation);
        match &report.sequence {
            Some(sequence) => debug!(scan = ?self.simulator.scan(), ?sequence, "System is in a safe state"),
            None => debug!(scan = ?self.simulator.scan(), "System is not in a safe state"),
        }
        report
    }

    /// Try to grant `request` to `process`.
    ///
    /// The grant is applied speculatively and kept only if the resulting
    /// state is safe; otherwise it is reverted and `WouldBeUnsafe` returned.
    /// `InsufficientAvailable` means the process must wait and may retry.
    pub fn request_resources(&mut self, process: usize, request: &[u32]) -> LedgerResult<Grant> {
        self.check_process(process)?;
        let request = self.check_vector(request)?;

        let need = self.need.row(process).ok_or(LedgerError::UnknownProcess(process))?;
        if !request.le(need) {
            debug!(process, %request, %need, "Request exceeds declared need");
            return Err(LedgerError::ExceedsNeed { process });
        }
        if !request.le(&self.available) {
            debug!(process, %request, available = %self.available, "Process must wait, resources not available");
            return Err(LedgerError::InsufficientAvailable { process });
        }

        let delta = RequestDelta::new(process, request);
        self.apply(&delta)?;

        let report = self.simulator.check(&self.available, &self.need, &self.allocation);
        match report.sequence {
            Some(safe_sequence) => {
                debug!(process, request = %delta.amounts(), ?safe_sequence, "Request granted");
                Ok(Grant { process, safe_sequence })
            }
            None => {
                self.revert(&delta)?;
                warn!(process, request = %delta.amounts(), "Request denied: granting would lead to unsafe state");
                Err(LedgerError::WouldBeUnsafe { process })
            }
        }
    }

    /// Return `release` units held by `process` to the free pool
    pub fn release_resources(&mut self, process: usize, release: &[u32]) -> LedgerResult<()> {
        self.check_process(process)?;
        let release = self.check_vector(release)?;

        let held = self.allocation.row(process).ok_or(LedgerError::UnknownProcess(process))?;
        if !release.le(held) {
            return Err(LedgerError::ExceedsAllocation { process });
        }

        let delta = RequestDelta::new(process, release);
        self.revert(&delta)?;
        debug!(process, release = %delta.amounts(), "Resources released");
        Ok(())
    }

    pub fn available(&self) -> &ResourceVector {
        &self.available
    }

    pub fn max_claim(&self) -> &Matrix {
        &self.max_claim
    }

    pub fn allocation(&self) -> &Matrix {
        &self.allocation
    }

    pub fn need(&self) -> &Matrix {
        &self.need
    }

    /// Units in circulation per resource type
    pub fn totals(&self) -> Vec<u64> {
        (0..self.resources).map(|r| u64::from(self.available[r]) + self.allocation.column_sum(r)).collect()
    }

    /// Copy of the full state for external reporting
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            available: self.available.clone(),
            max_claim: self.max_claim.clone(),
            allocation: self.allocation.clone(),
            need: self.need.clone(),
            totals: self.totals(),
        }
    }

    fn apply(&mut self, delta: &RequestDelta) -> LedgerResult<()> {
        let process = delta.process();
        let (Some(allocation), Some(need)) = (self.allocation.row_mut(process), self.need.row_mut(process)) else {
            return Err(LedgerError::UnknownProcess(process));
        };
        delta.apply(&mut self.available, allocation, need);
        Ok(())
    }

    fn revert(&mut self, delta: &RequestDelta) -> LedgerResult<()> {
        let process = delta.process();
        let (Some(allocation), Some(need)) = (self.allocation.row_mut(process), self.need.row_mut(process)) else {
            return Err(LedgerError::UnknownProcess(process));
        };
        delta.revert(&mut self.available, allocation, need);
        Ok(())
    }

    fn check_process(&self, process: usize) -> LedgerResult<()> {
        if process >= self.processes {
            return Err(LedgerError::UnknownProcess(process));
        }
        Ok(())
    }

    fn check_vector(&self, values: &[u32]) -> LedgerResult<ResourceVector> {
        if values.len() != self.resources {
            return Err(LedgerError::DimensionMismatch {
                expected: (1, self.resources),
                found: (1, values.len()),
            });
        }
        Ok(ResourceVector::from(values))
    }

    fn check_matrix(&self, values: Vec<Vec<u32>>) -> LedgerResult<Matrix> {
        Matrix::from_rows(values, self.processes, self.resources).map_err(|found| LedgerError::DimensionMismatch {
            expected: (self.processes, self.resources),
            found,
        })
    }
}

fn check_totals(available: &ResourceVector, allocation: &Matrix) -> LedgerResult<()> {
    for (resource, free) in available.iter().enumerate() {
        if u64::from(free) + allocation.column_sum(resource) > u64::from(u32::MAX) {
            return Err(LedgerError::TotalOverflow { resource });
        }
    }
    Ok(())
}

impl fmt::Display for ResourceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "System State Summary:")?;
        writeln!(f, "Available Resources: {}", self.available)?;
        writeln!(f)?;
        writeln!(f, "Process Information:")?;
        for p in 0..self.processes {
            let (Some(allocation), Some(max_claim), Some(need)) = (self.allocation.row(p), self.max_claim.row(p), self.need.row(p)) else {
                continue;
            };
            writeln!(f, "Process {p}:")?;
            writeln!(f, "  Allocation: {allocation}")?;
            writeln!(f, "  Max Claim:  {max_claim}")?;
            writeln!(f, "  Need:       {need}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadlock_common::SafetyScan;

    fn textbook_ledger() -> ResourceLedger {
        let mut ledger = ResourceLedger::new(5, 3);
        ledger.set_available(vec![3, 3, 2]).unwrap();
        ledger.set_max_claim(vec![vec![7, 5, 3], vec![3, 2, 2], vec![9, 0, 2], vec![2, 2, 2], vec![4, 3, 3]]).unwrap();
        ledger.set_allocation(vec![vec![0, 1, 0], vec![2, 0, 0], vec![3, 0, 2], vec![2, 1, 1], vec![0, 0, 2]]).unwrap();
        ledger
    }

    #[test]
    fn test_need_is_derived() {
        let ledger = textbook_ledger();
        assert_eq!(ledger.need().row(0).unwrap().as_slice(), &[7, 4, 3]);
        assert_eq!(ledger.need().row(1).unwrap().as_slice(), &[1, 2, 2]);
        assert_eq!(ledger.need().row(4).unwrap().as_slice(), &[4, 3, 1]);
    }

    #[test]
    fn test_textbook_state_is_safe() {
        let report = textbook_ledger().is_safe();
        assert!(report.safe);
        let sequence = report.sequence.unwrap();
        assert_eq!(&sequence[..2], &[1, 3]);
        assert_eq!(sequence, vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_round_robin_configuration() {
        let mut ledger = ResourceLedger::with_config(5, 3, LedgerConfig { scan: SafetyScan::RoundRobin });
        ledger.set_available(vec![3, 3, 2]).unwrap();
        ledger.set_max_claim(vec![vec![7, 5, 3], vec![3, 2, 2], vec![9, 0, 2], vec![2, 2, 2], vec![4, 3, 3]]).unwrap();
        ledger.set_allocation(vec![vec![0, 1, 0], vec![2, 0, 0], vec![3, 0, 2], vec![2, 1, 1], vec![0, 0, 2]]).unwrap();
        assert_eq!(ledger.is_safe().sequence, Some(vec![1, 3, 4, 0, 2]));
    }

    #[test]
    fn test_safe_request_is_granted() {
        let mut ledger = textbook_ledger();
        let grant = ledger.request_resources(1, &[1, 0, 2]).unwrap();
        assert_eq!(grant.process, 1);
        assert_eq!(grant.safe_sequence.len(), 5);
        assert_eq!(ledger.available().as_slice(), &[2, 3, 0]);
        assert_eq!(ledger.allocation().row(1).unwrap().as_slice(), &[3, 0, 2]);
        assert_eq!(ledger.need().row(1).unwrap().as_slice(), &[0, 2, 0]);
    }

    #[test]
    fn test_request_exceeding_need_is_rejected() {
        let mut ledger = textbook_ledger();
        let before = ledger.snapshot();
        assert_eq!(ledger.request_resources(3, &[1, 0, 0]), Err(LedgerError::ExceedsNeed { process: 3 }));
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_request_exceeding_available_must_wait() {
        let mut ledger = textbook_ledger();
        let before = ledger.snapshot();
        let err = ledger.request_resources(0, &[4, 0, 0]).unwrap_err();
        assert_eq!(err, LedgerError::InsufficientAvailable { process: 0 });
        assert!(err.is_retryable());
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_unsafe_request_is_rolled_back() {
        let mut ledger = textbook_ledger();
        ledger.request_resources(1, &[1, 0, 2]).unwrap();
        let before = ledger.snapshot();

        // Available is [2, 3, 0]; handing P0 [0, 2, 0] leaves nobody able to finish
        assert_eq!(ledger.request_resources(0, &[0, 2, 0]), Err(LedgerError::WouldBeUnsafe { process: 0 }));
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_release_returns_units() {
        let mut ledger = textbook_ledger();
        let totals = ledger.totals();
        ledger.release_resources(2, &[3, 0, 0]).unwrap();
        assert_eq!(ledger.available().as_slice(), &[6, 3, 2]);
        assert_eq!(ledger.need().row(2).unwrap().as_slice(), &[9, 0, 0]);
        assert_eq!(ledger.totals(), totals);

        assert_eq!(ledger.release_resources(2, &[1, 0, 0]), Err(LedgerError::ExceedsAllocation { process: 2 }));
    }

    #[test]
    fn test_dimension_mismatch_leaves_state() {
        let mut ledger = textbook_ledger();
        let before = ledger.snapshot();

        assert_eq!(ledger.set_available(vec![1, 2]), Err(LedgerError::DimensionMismatch { expected: (1, 3), found: (1, 2) }));
        assert_eq!(
            ledger.set_max_claim(vec![vec![1, 1, 1]; 4]),
            Err(LedgerError::DimensionMismatch { expected: (5, 3), found: (4, 3) })
        );
        assert_eq!(
            ledger.set_allocation(vec![vec![0, 0, 0], vec![0, 0], vec![0, 0, 0], vec![0, 0, 0], vec![0, 0, 0]]),
            Err(LedgerError::DimensionMismatch { expected: (5, 3), found: (5, 2) })
        );
        assert!(matches!(ledger.request_resources(0, &[1]), Err(LedgerError::DimensionMismatch { .. })));
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_unknown_process() {
        let mut ledger = textbook_ledger();
        assert_eq!(ledger.request_resources(5, &[0, 0, 0]), Err(LedgerError::UnknownProcess(5)));
        assert_eq!(ledger.release_resources(7, &[0, 0, 0]), Err(LedgerError::UnknownProcess(7)));
    }

    #[test]
    fn test_totals_must_fit_in_u32() {
        let mut ledger = ResourceLedger::new(2, 2);
        ledger.set_available(vec![u32::MAX, 0]).unwrap();
        ledger.set_max_claim(vec![vec![1, 5], vec![0, 5]]).unwrap();
        assert_eq!(ledger.set_allocation(vec![vec![1, 0], vec![0, 0]]), Err(LedgerError::TotalOverflow { resource: 0 }));
        assert!(ledger.allocation().iter_rows().all(|row| row.is_zero()));

        ledger.set_available(vec![u32::MAX - 1, 0]).unwrap();
        ledger.set_allocation(vec![vec![1, 0], vec![0, 0]]).unwrap();
        assert_eq!(ledger.set_available(vec![u32::MAX, 0]), Err(LedgerError::TotalOverflow { resource: 0 }));

        ledger.release_resources(0, &[1, 0]).unwrap();
        assert_eq!(ledger.available().as_slice(), &[u32::MAX, 0]);
        assert_eq!(ledger.totals(), vec![u64::from(u32::MAX), 0]);
    }

    #[test]
    fn test_allocation_above_claim_rejected() {
        let mut ledger = ResourceLedger::new(2, 1);
        ledger.set_max_claim(vec![vec![2], vec![1]]).unwrap();
        assert_eq!(ledger.set_allocation(vec![vec![1], vec![2]]), Err(LedgerError::AllocationExceedsClaim { process: 1 }));

        ledger.set_allocation(vec![vec![2], vec![0]]).unwrap();
        assert_eq!(ledger.set_max_claim(vec![vec![1], vec![1]]), Err(LedgerError::AllocationExceedsClaim { process: 0 }));
        assert_eq!(ledger.max_claim().row(0).unwrap().as_slice(), &[2]);
    }

    #[test]
    fn test_summary_layout() {
        let summary = textbook_ledger().to_string();
        assert!(summary.starts_with("System State Summary:\nAvailable Resources: [3, 3, 2]\n"));
        assert!(summary.contains("Process 4:\n  Allocation: [0, 0, 2]\n  Max Claim:  [4, 3, 3]\n  Need:       [4, 3, 1]\n"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(textbook_ledger().snapshot()).unwrap();
        assert_eq!(json["available"], serde_json::json!([3, 3, 2]));
        assert_eq!(json["need"][1], serde_json::json!([1, 2, 2]));
        assert_eq!(json["totals"], serde_json::json!([10, 5, 7]));
    }
}
