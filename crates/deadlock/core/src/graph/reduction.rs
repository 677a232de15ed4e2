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

//! Graph reduction for multi-instance resources
//!
//! Free instances form the work vector, each outstanding request counts as a
//! need of one unit and each allocation edge as one held unit. A process
//! whose requests can all be met is assumed to finish and release what it
//! holds. Processes that never finish are deadlocked.

use deadlock_common::SafetyScan;

use super::rag::ResourceAllocationGraph;
use super::types::ProcessId;
use crate::ledger::{Matrix, ResourceVector, SafetySimulator};

/// Result of reducing a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Processes in the order they were reduced away
    pub finished: Vec<ProcessId>,
    /// Processes that can never proceed
    pub blocked: Vec<ProcessId>,
}

impl Reduction {
    pub fn is_deadlocked(&self) -> bool {
        !self.blocked.is_empty()
    }
}

/// Reduce `graph`, returning which processes finish and which stay blocked
pub fn reduce(graph: &ResourceAllocationGraph) -> Reduction {
    let processes: Vec<ProcessId> = graph.processes().cloned().collect();
    let resources: Vec<_> = graph.resources().collect();

    let available = ResourceVector::from(resources.iter().map(|info| info.free()).collect::<Vec<u32>>());

    let need: Vec<Vec<u32>> = processes
        .iter()
        .map(|process| {
            let requests = graph.requests_of(process.as_str());
            resources.iter().map(|info| u32::from(requests.is_some_and(|set| set.contains(&info.id)))).collect()
        })
        .collect();
    let allocation: Vec<Vec<u32>> = processes
        .iter()
        .map(|process| resources.iter().map(|info| info.holders.iter().filter(|holder| *holder == process).count() as u32).collect())
        .collect();

    // Shapes are built from the same process and resource lists
    let (Ok(need), Ok(allocation)) = (
        Matrix::from_rows(need, processes.len(), resources.len()),
        Matrix::from_rows(allocation, processes.len(), resources.len()),
    ) else {
        return Reduction {
            finished: Vec::new(),
            blocked: processes,
        };
    };

    let simulation = SafetySimulator::new(SafetyScan::LowestIndexFirst).run(&available, &need, &allocation);
    Reduction {
        finished: simulation.order.iter().map(|&p| processes[p].clone()).collect(),
        blocked: simulation.unfinished().into_iter().map(|p| processes[p].clone()).collect(),
    }
}
