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

//! Safety simulation
//!
//! Starting from the free units, repeatedly pick an unfinished process whose
//! remaining need fits in the work vector, let it run to completion and
//! return its allocation to the pool. The state is safe iff every process
//! finishes. The same simulation drives graph reduction in the detector,
//! where "need" is the set of outstanding requests.
//!
//! Cost is O(N² · M) for N processes and M resource types.

use deadlock_common::SafetyScan;
use serde::Serialize;

use super::vector::{Matrix, ResourceVector};

/// Result of a safety check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyReport {
    /// Whether all processes can finish
    pub safe: bool,
    /// Witness order, present only when the state is safe
    pub sequence: Option<Vec<usize>>,
}

impl SafetyReport {
    pub fn is_safe(&self) -> bool {
        self.safe
    }
}

/// Raw outcome of one simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    /// Processes in the order they finished
    pub order: Vec<usize>,
    /// Per-process finish flag
    pub finished: Vec<bool>,
}

impl Simulation {
    pub fn all_finished(&self) -> bool {
        self.finished.iter().all(|&f| f)
    }

    /// Processes that never finished, in index order
    pub fn unfinished(&self) -> Vec<usize> {
        self.finished.iter().enumerate().filter(|&(_, &f)| !f).map(|(p, _)| p).collect()
    }

    pub fn into_report(self) -> SafetyReport {
        let safe = self.all_finished();
        SafetyReport {
            safe,
            sequence: safe.then_some(self.order),
        }
    }
}

/// Runs the safety algorithm with a fixed scan order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetySimulator {
    scan: SafetyScan,
}

impl SafetySimulator {
    pub fn new(scan: SafetyScan) -> Self {
        Self { scan }
    }

    pub fn scan(&self) -> SafetyScan {
        self.scan
    }

    /// Simulate from `available` with the given need and allocation matrices.
    ///
    /// The matrices must have one row per process and `available.len()`
    /// columns.
    pub fn run(&self, available: &ResourceVector, need: &Matrix, allocation: &Matrix) -> Simulation {
        let processes = need.rows();
        let mut work = available.clone();
        let mut finished = vec![false; processes];
        let mut order = Vec::with_capacity(processes);
        let mut cursor = 0;

        loop {
            let start = match self.scan {
                SafetyScan::LowestIndexFirst => 0,
                SafetyScan::RoundRobin => cursor,
            };

            let next = (0..processes)
                .map(|offset| (start + offset) % processes)
                .find(|&p| !finished[p] && need.row(p).is_some_and(|row| row.le(&work)));

            let Some(process) = next else {
                break;
            };

            if let Some(held) = allocation.row(process) {
                work.accumulate(held);
            }
            finished[process] = true;
            order.push(process);
            cursor = (process + 1) % processes;
        }

        Simulation { order, finished }
    }

    /// Run the simulation and summarize it as a safety report
    pub fn check(&self, available: &ResourceVector, need: &Matrix, allocation: &Matrix) -> SafetyReport {
        self.run(available, need, allocation).into_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textbook() -> (ResourceVector, Matrix, Matrix) {
        let max = Matrix::from_rows(vec![vec![7, 5, 3], vec![3, 2, 2], vec![9, 0, 2], vec![2, 2, 2], vec![4, 3, 3]], 5, 3).unwrap();
        let alloc = Matrix::from_rows(vec![vec![0, 1, 0], vec![2, 0, 0], vec![3, 0, 2], vec![2, 1, 1], vec![0, 0, 2]], 5, 3).unwrap();
        let need = max.checked_sub(&alloc).unwrap();
        (ResourceVector::from(vec![3, 3, 2]), need, alloc)
    }

    #[test]
    fn test_lowest_index_first_sequence() {
        let (available, need, alloc) = textbook();
        let report = SafetySimulator::new(SafetyScan::LowestIndexFirst).check(&available, &need, &alloc);
        assert!(report.safe);
        assert_eq!(report.sequence, Some(vec![1, 3, 0, 2, 4]));
    }

    #[test]
    fn test_round_robin_sequence() {
        let (available, need, alloc) = textbook();
        let simulator = SafetySimulator::new(SafetyScan::RoundRobin);
        assert_eq!(simulator.scan(), SafetyScan::RoundRobin);
        let report = simulator.check(&available, &need, &alloc);
        assert!(report.safe);
        assert_eq!(report.sequence, Some(vec![1, 3, 4, 0, 2]));
    }

    #[test]
    fn test_unsafe_state_has_no_sequence() {
        let (_, need, alloc) = textbook();
        let sim = SafetySimulator::default().run(&ResourceVector::from(vec![0, 0, 0]), &need, &alloc);
        assert!(!sim.all_finished());
        assert_eq!(sim.unfinished(), vec![0, 1, 2, 3, 4]);
        assert_eq!(sim.into_report(), SafetyReport { safe: false, sequence: None });
    }

    #[test]
    fn test_partial_progress() {
        // P1 can finish and return its unit, P0 needs more than ever exists
        let need = Matrix::from_rows(vec![vec![5], vec![1]], 2, 1).unwrap();
        let alloc = Matrix::from_rows(vec![vec![0], vec![1]], 2, 1).unwrap();
        let sim = SafetySimulator::default().run(&ResourceVector::from(vec![1]), &need, &alloc);
        assert_eq!(sim.order, vec![1]);
        assert_eq!(sim.unfinished(), vec![0]);
    }

    #[test]
    fn test_no_processes_is_safe() {
        let report = SafetySimulator::default().check(&ResourceVector::from(vec![1, 2]), &Matrix::zeros(0, 2), &Matrix::zeros(0, 2));
        assert!(report.safe);
        assert_eq!(report.sequence, Some(vec![]));
    }
}
