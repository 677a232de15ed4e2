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

// Resource allocation graph scenarios

use deadlock_core::{DeadlockDetector, DetectionStrategy, DetectorConfig, GraphError, NodeId, ResourceAllocationGraph};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// P1..P4 each hold one single-instance resource and request the next one
fn ring() -> ResourceAllocationGraph {
    let mut rag = ResourceAllocationGraph::new();
    for i in 1..=4 {
        rag.add_process(format!("P{i}")).unwrap();
        rag.add_resource(format!("R{i}"), 1).unwrap();
    }
    for (resource, process) in [("R1", "P1"), ("R2", "P2"), ("R3", "P3"), ("R4", "P4")] {
        rag.allocation_edge(resource, process).unwrap();
    }
    for (process, resource) in ring_requests() {
        rag.request_edge(process, resource).unwrap();
    }
    rag
}

fn ring_requests() -> [(&'static str, &'static str); 4] {
    [("P1", "R2"), ("P2", "R3"), ("P3", "R4"), ("P4", "R1")]
}

#[test]
fn test_single_instance_ring_is_deadlocked() {
    init_tracing();
    let (deadlocked, cycles) = ring().detect_deadlock();

    assert!(deadlocked);
    assert_eq!(cycles.len(), 1);
    let cycle = &cycles[0];
    assert_eq!(cycle.len(), 8);
    assert!(cycle.is_alternating());
    assert_eq!(cycle.to_string(), "P1 → R2 → P2 → R3 → P3 → R4 → P4 → R1 → P1");
}

#[test]
fn test_long_ring_is_detected_without_recursion() {
    let size = 50_000;
    let mut rag = ResourceAllocationGraph::new();
    for i in 0..size {
        rag.add_process(format!("P{i}")).unwrap();
        rag.add_resource(format!("R{i}"), 1).unwrap();
    }
    for i in 0..size {
        rag.allocation_edge(&format!("R{i}"), &format!("P{i}")).unwrap();
        rag.request_edge(&format!("P{i}"), &format!("R{}", (i + 1) % size)).unwrap();
    }

    let (deadlocked, cycles) = rag.detect_deadlock();
    assert!(deadlocked);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 2 * size);
    assert!(cycles[0].is_alternating());

    rag.remove_request_edge("P0", "R1");
    assert!(!rag.detect_deadlock().0);
}

#[test]
fn test_removing_any_ring_request_resolves_deadlock() {
    for (process, resource) in ring_requests() {
        let mut rag = ring();
        rag.remove_request_edge(process, resource);
        let (deadlocked, cycles) = rag.detect_deadlock();
        assert!(!deadlocked, "removing {process} -> {resource} should break the cycle");
        assert!(cycles.is_empty());
    }
}

#[test]
fn test_releasing_an_allocation_resolves_deadlock() {
    let mut rag = ring();
    rag.remove_allocation_edge("R3", "P3");
    assert!(!rag.detect_deadlock().0);
}

#[test]
fn test_instance_count_boundaries() {
    let mut rag = ResourceAllocationGraph::new();
    assert!(matches!(rag.add_resource("R1", 0), Err(GraphError::InvalidInstanceCount { .. })));
    assert!(matches!(rag.add_resource("R1", -1), Err(GraphError::InvalidInstanceCount { .. })));

    rag.add_resource("R1", 2).unwrap();
    for p in ["P1", "P2", "P3"] {
        rag.add_process(p).unwrap();
    }
    rag.allocation_edge("R1", "P1").unwrap();
    rag.allocation_edge("R1", "P2").unwrap();
    let edges = rag.edges();

    assert!(matches!(rag.allocation_edge("R1", "P3"), Err(GraphError::InstancesExhausted { instances: 2, .. })));
    assert_eq!(rag.edges(), edges);
}

/// Mixed instance counts with a fifth process waiting on a two-instance resource
#[test]
fn test_mixed_instance_workload() {
    init_tracing();
    let mut rag = ResourceAllocationGraph::new();
    for i in 1..=5 {
        rag.add_process(format!("P{i}")).unwrap();
    }
    for (resource, instances) in [("R1", 2), ("R2", 1), ("R3", 3), ("R4", 1)] {
        rag.add_resource(resource, instances).unwrap();
    }
    for (resource, process) in [("R1", "P1"), ("R2", "P2"), ("R3", "P3"), ("R4", "P4")] {
        rag.allocation_edge(resource, process).unwrap();
    }
    for (process, resource) in [("P1", "R2"), ("P2", "R3"), ("P3", "R4"), ("P4", "R1"), ("P5", "R1")] {
        rag.request_edge(process, resource).unwrap();
    }

    // Cycle search sees the ring through R1..R4
    let (deadlocked, cycles) = rag.detect_deadlock();
    assert!(deadlocked);
    assert_eq!(cycles.len(), 1);
    assert!(!cycles[0].contains(&NodeId::Process("P5".into())));

    // R1 and R3 still have free instances, so reduction lets everyone finish
    let detector = DeadlockDetector::with_graph(rag.clone(), DetectorConfig::default());
    let report = detector.detect();
    assert_eq!(report.strategy, DetectionStrategy::Reduction);
    assert!(!report.deadlocked);

    rag.remove_request_edge("P4", "R1");
    assert!(!rag.detect_deadlock().0);
}

#[test]
fn test_deadlock_created_by_rewiring_requests() {
    let mut rag = ResourceAllocationGraph::new();
    for i in 1..=4 {
        rag.add_process(format!("P{i}")).unwrap();
    }
    for i in 1..=3 {
        rag.add_resource(format!("R{i}"), 1).unwrap();
    }
    rag.allocation_edge("R1", "P1").unwrap();
    rag.allocation_edge("R2", "P3").unwrap();
    rag.allocation_edge("R3", "P4").unwrap();
    for (process, resource) in [("P1", "R2"), ("P2", "R1"), ("P3", "R3"), ("P4", "R1")] {
        rag.request_edge(process, resource).unwrap();
    }

    // P1 -> R2 -> P3 -> R3 -> P4 -> R1 -> P1
    let (deadlocked, cycles) = rag.detect_deadlock();
    assert!(deadlocked);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 6);

    rag.remove_request_edge("P2", "R1");
    rag.request_edge("P3", "R1").unwrap();

    // Adds P1 -> R2 -> P3 -> R1 -> P1 alongside the first ring
    let (deadlocked, cycles) = rag.detect_deadlock();
    assert!(deadlocked);
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().all(|cycle| cycle.is_alternating()));
}

#[test]
fn test_detector_matches_graph_for_single_instance() {
    let detector = DeadlockDetector::with_graph(
        ring(),
        DetectorConfig {
            strategy: DetectionStrategy::Reduction,
            ..DetectorConfig::default()
        },
    );
    let report = detector.detect();
    assert!(report.deadlocked);
    assert_eq!(report.blocked.len(), 4);
    assert_eq!(report.cycles.len(), 1);
}

#[test]
fn test_snapshot_json() {
    let snapshot = ring().snapshot();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["processes"], serde_json::json!(["P1", "P2", "P3", "P4"]));
    assert_eq!(json["resources"][0], serde_json::json!({"id": "R1", "instances": 1, "holders": ["P1"]}));
    assert_eq!(json["edges"].as_array().map(Vec::len), Some(8));
    assert_eq!(json["edges"][0], serde_json::json!({"kind": "request", "process": "P1", "resource": "R2"}));
}
