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

//! Deadlock Detection
//!
//! Thread-safe detector over a resource allocation graph. Edge mutations take
//! the write lock and detection takes the read lock, so a detection run always
//! sees a consistent edge set.
//!
//! Cycle search is exact for single-instance resources only. Reduction is
//! exact for any instance counts. `DetectionStrategy::Auto` picks cycle search
//! when every resource has a single instance and reduction otherwise.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use deadlock_common::{DetectionStrategy, DetectorConfig, GraphResult};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use super::rag::{GraphSnapshot, ResourceAllocationGraph};
use super::reduction::reduce;
use super::types::{Cycle, ProcessId};

/// Result of one detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlockReport {
    /// Whether a deadlock exists
    pub deadlocked: bool,
    /// Strategy actually used (never `Auto`)
    pub strategy: DetectionStrategy,
    /// Circular waits found, capped at the configured maximum
    pub cycles: Vec<Cycle>,
    /// Processes that can never proceed. Only filled in by reduction.
    pub blocked: Vec<ProcessId>,
}

/// Statistics about deadlock detection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionStatistics {
    /// Number of detection runs
    pub detections_run: u64,
    /// Runs that found a deadlock
    pub deadlocks_detected: u64,
    /// Duration of the most recent run in microseconds
    pub last_detection_time_us: u64,
    /// Running average detection time in microseconds
    pub average_detection_time_us: u64,
}

/// Deadlock detector that owns a resource allocation graph
pub struct DeadlockDetector {
    graph: RwLock<ResourceAllocationGraph>,
    config: DetectorConfig,
    statistics: Mutex<DetectionStatistics>,
}

impl DeadlockDetector {
    /// Create a detector over an empty graph
    pub fn new(config: DetectorConfig) -> Self {
        let graph = ResourceAllocationGraph::with_auto_register(config.auto_register);
        Self::with_graph(graph, config)
    }

    /// Create a detector over an existing graph
    pub fn with_graph(graph: ResourceAllocationGraph, config: DetectorConfig) -> Self {
        Self {
            graph: RwLock::new(graph),
            config,
            statistics: Mutex::new(DetectionStatistics::default()),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn add_process(&self, id: &str) -> GraphResult<()> {
        self.graph.write().add_process(id)
    }

    pub fn add_resource(&self, id: &str, instances: i64) -> GraphResult<()> {
        self.graph.write().add_resource(id, instances)
    }

    pub fn request_edge(&self, process: &str, resource: &str) -> GraphResult<()> {
        self.graph.write().request_edge(process, resource)
    }

    pub fn allocation_edge(&self, resource: &str, process: &str) -> GraphResult<()> {
        self.graph.write().allocation_edge(resource, process)
    }

    pub fn remove_request_edge(&self, process: &str, resource: &str) {
        self.graph.write().remove_request_edge(process, resource)
    }

    pub fn remove_allocation_edge(&self, resource: &str, process: &str) {
        self.graph.write().remove_allocation_edge(resource, process)
    }

    /// Run detection with the configured strategy
    pub fn detect(&self) -> DeadlockReport {
        let detection_start = Instant::now();
        let report = {
            let graph = self.graph.read();
            self.run(&graph)
        };
        self.record(&report, detection_start.elapsed());
        report
    }

    fn run(&self, graph: &ResourceAllocationGraph) -> DeadlockReport {
        let strategy = match self.config.strategy {
            DetectionStrategy::Auto if graph.is_single_instance() => DetectionStrategy::CycleSearch,
            DetectionStrategy::Auto => DetectionStrategy::Reduction,
            strategy => strategy,
        };

        match strategy {
            DetectionStrategy::Reduction => {
                let reduction = reduce(graph);
                let cycles = if reduction.is_deadlocked() {
                    let blocked: BTreeSet<&ProcessId> = reduction.blocked.iter().collect();
                    let mut cycles: Vec<Cycle> = graph
                        .find_cycles(None)
                        .into_iter()
                        .filter(|cycle| cycle.processes().all(|process| blocked.contains(process)))
                        .collect();
                    if let Some(max) = self.config.max_cycles {
                        cycles.truncate(max);
                    }
                    cycles
                } else {
                    Vec::new()
                };
                DeadlockReport {
                    deadlocked: reduction.is_deadlocked(),
                    strategy,
                    cycles,
                    blocked: reduction.blocked,
                }
            }
            _ => {
                // At least one cycle is needed for the verdict even when none are reported
                let limit = self.config.max_cycles.map(|max| max.max(1));
                let mut cycles = graph.find_cycles(limit);
                let deadlocked = !cycles.is_empty();
                if let Some(max) = self.config.max_cycles {
                    cycles.truncate(max);
                }
                DeadlockReport {
                    deadlocked,
                    strategy: DetectionStrategy::CycleSearch,
                    cycles,
                    blocked: Vec::new(),
                }
            }
        }
    }

    fn record(&self, report: &DeadlockReport, detection_time: Duration) {
        let detection_time_us = saturating_micros(detection_time);
        let mut stats = self.statistics.lock();
        stats.detections_run += 1;
        stats.last_detection_time_us = detection_time_us;
        if stats.average_detection_time_us == 0 {
            stats.average_detection_time_us = detection_time_us;
        } else {
            stats.average_detection_time_us = (stats.average_detection_time_us + detection_time_us) / 2;
        }

        if report.deadlocked {
            stats.deadlocks_detected += 1;
            info!(strategy = ?report.strategy, cycles = report.cycles.len(), blocked = report.blocked.len(), "Deadlock detected");
        } else {
            debug!(strategy = ?report.strategy, "No deadlock detected");
        }
    }

    /// Get current detection statistics
    pub fn statistics(&self) -> DetectionStatistics {
        self.statistics.lock().clone()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().snapshot()
    }

    /// Read the graph under a shared lock
    pub fn read<R>(&self, f: impl FnOnce(&ResourceAllocationGraph) -> R) -> R {
        let graph = self.graph.read();
        f(&graph)
    }

    /// Release the graph
    pub fn into_inner(self) -> ResourceAllocationGraph {
        self.graph.into_inner()
    }
}

/// Whole microseconds, clamped to `u64::MAX`
fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl Default for DeadlockDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
