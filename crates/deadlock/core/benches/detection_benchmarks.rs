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

//! Safety simulation and deadlock detection benchmarks
//!
//! Safety checks grow as O(N² · M). Cycle enumeration grows with the number
//! of simple cycles, which is exponential in the worst case; the dense graph
//! group shows that growth.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use deadlock_core::{DeadlockDetector, DetectionStrategy, DetectorConfig, ResourceAllocationGraph, ResourceLedger};

/// Ledger where process p holds one unit of every type and may claim two
fn ledger(processes: usize, resources: usize) -> ResourceLedger {
    let mut ledger = ResourceLedger::new(processes, resources);
    ledger.set_available(vec![1; resources]).unwrap();
    ledger.set_max_claim(vec![vec![2; resources]; processes]).unwrap();
    ledger.set_allocation(vec![vec![1; resources]; processes]).unwrap();
    ledger
}

/// Single-instance ring of `size` processes
fn ring(size: usize) -> ResourceAllocationGraph {
    let mut rag = ResourceAllocationGraph::new();
    for i in 0..size {
        rag.add_process(format!("P{i}")).unwrap();
        rag.add_resource(format!("R{i}"), 1).unwrap();
    }
    for i in 0..size {
        rag.allocation_edge(&format!("R{i}"), &format!("P{i}")).unwrap();
        rag.request_edge(&format!("P{i}"), &format!("R{}", (i + 1) % size)).unwrap();
    }
    rag
}

/// Every process holds its own resource and requests every other one
fn dense(size: usize) -> ResourceAllocationGraph {
    let mut rag = ResourceAllocationGraph::new();
    for i in 0..size {
        rag.add_process(format!("P{i}")).unwrap();
        rag.add_resource(format!("R{i}"), 1).unwrap();
    }
    for i in 0..size {
        rag.allocation_edge(&format!("R{i}"), &format!("P{i}")).unwrap();
        for j in (0..size).filter(|&j| j != i) {
            rag.request_edge(&format!("P{i}"), &format!("R{j}")).unwrap();
        }
    }
    rag
}

fn bench_safety(c: &mut Criterion) {
    let mut group = c.benchmark_group("safety_check");
    for processes in [8, 32, 128] {
        let ledger = ledger(processes, 4);
        group.bench_with_input(BenchmarkId::from_parameter(processes), &ledger, |b, ledger| b.iter(|| black_box(ledger.is_safe())));
    }
    group.finish();
}

fn bench_ring_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_detection");
    for size in [4, 16, 64] {
        let rag = ring(size);
        group.bench_with_input(BenchmarkId::new("cycle_search", size), &rag, |b, rag| b.iter(|| black_box(rag.detect_deadlock())));

        let detector = DeadlockDetector::with_graph(
            rag.clone(),
            DetectorConfig {
                strategy: DetectionStrategy::Reduction,
                ..DetectorConfig::default()
            },
        );
        group.bench_with_input(BenchmarkId::new("reduction", size), &detector, |b, detector| b.iter(|| black_box(detector.detect())));
    }
    group.finish();
}

fn bench_dense_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_detection");
    for size in [3, 4, 5] {
        let rag = dense(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rag, |b, rag| b.iter(|| black_box(rag.detect_deadlock())));
    }
    group.finish();
}

criterion_group!(detection_benches, bench_safety, bench_ring_detection, bench_dense_detection);

criterion_main!(detection_benches);
