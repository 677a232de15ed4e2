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

//! Simple cycle enumeration (Johnson's algorithm)
//!
//! Works on a dense adjacency list over node indices `0..n`. Components are
//! searched in order of their smallest node `s`: every simple cycle through
//! `s` is reported, `s` is removed, and the rest of the component is split
//! into strongly connected components again. Every simple cycle is therefore
//! reported exactly once, beginning at its smallest node, and cycles come
//! out ordered by that node.
//!
//! The number of simple cycles can grow exponentially with graph density;
//! so can the running time. Use `limit` to bound the output. Both the search
//! and the component split run on explicit stacks, so path length is bounded
//! by memory rather than by the thread stack.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

/// Enumerate the simple cycles of `adjacency`, stopping after `limit` cycles
pub fn simple_cycles(adjacency: &[Vec<usize>], limit: Option<usize>) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut components = Components::new(adjacency);
    let mut search = CircuitSearch {
        adjacency,
        component: vec![false; n],
        blocked: vec![false; n],
        blocked_by: vec![BTreeSet::new(); n],
        stack: Vec::new(),
        cycles: Vec::new(),
        limit,
    };

    let all: Vec<usize> = (0..n).collect();
    // Pending components are disjoint and sorted, so each is keyed by its smallest node
    let mut pending: BinaryHeap<Reverse<Vec<usize>>> = components.cyclic(&all).into_iter().map(Reverse).collect();

    while let Some(Reverse(component)) = pending.pop() {
        if search.is_done() {
            break;
        }
        let Some(&start) = component.first() else {
            continue;
        };

        for &node in &component {
            search.component[node] = true;
            search.blocked[node] = false;
            search.blocked_by[node].clear();
        }
        search.circuit(start);
        for &node in &component {
            search.component[node] = false;
        }

        pending.extend(components.cyclic(&component[1..]).into_iter().map(Reverse));
    }

    search.cycles
}

/// One node on the search path
struct Frame {
    node: usize,
    /// Index of the next neighbour to visit
    next: usize,
    /// Whether a cycle through `start` was found below this node
    found: bool,
}

struct CircuitSearch<'a> {
    adjacency: &'a [Vec<usize>],
    /// Membership of the component currently searched
    component: Vec<bool>,
    blocked: Vec<bool>,
    /// `blocked_by[w]` holds nodes to unblock once `w` is unblocked
    blocked_by: Vec<BTreeSet<usize>>,
    stack: Vec<usize>,
    cycles: Vec<Vec<usize>>,
    limit: Option<usize>,
}

impl CircuitSearch<'_> {
    fn is_done(&self) -> bool {
        self.limit.is_some_and(|limit| self.cycles.len() >= limit)
    }

    fn enter(&mut self, frames: &mut Vec<Frame>, node: usize) {
        frames.push(Frame { node, next: 0, found: false });
        self.stack.push(node);
        self.blocked[node] = true;
    }

    /// Report every simple cycle through `start` within the current component
    fn circuit(&mut self, start: usize) {
        let adjacency = self.adjacency;
        let mut frames = Vec::new();
        self.enter(&mut frames, start);

        while let Some(frame) = frames.last_mut() {
            let node = frame.node;
            if !self.is_done() {
                if let Some(&next) = adjacency[node].get(frame.next) {
                    frame.next += 1;
                    if !self.component[next] {
                        continue;
                    }
                    if next == start {
                        self.cycles.push(self.stack.clone());
                        frame.found = true;
                    } else if !self.blocked[next] {
                        self.enter(&mut frames, next);
                    }
                    continue;
                }
            }

            let found = frame.found;
            frames.pop();
            self.stack.pop();
            if found {
                self.unblock(node);
                if let Some(parent) = frames.last_mut() {
                    parent.found = true;
                }
            } else {
                for &next in &adjacency[node] {
                    if self.component[next] {
                        self.blocked_by[next].insert(node);
                    }
                }
            }
        }
    }

    fn unblock(&mut self, node: usize) {
        let mut pending = vec![node];
        while let Some(node) = pending.pop() {
            self.blocked[node] = false;
            for other in std::mem::take(&mut self.blocked_by[node]) {
                if self.blocked[other] {
                    pending.push(other);
                }
            }
        }
    }
}

/// Iterative Tarjan over induced subgraphs. Scratch state is sized once and
/// reset only for the nodes of each call.
struct Components<'a> {
    adjacency: &'a [Vec<usize>],
    member: Vec<bool>,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
}

impl<'a> Components<'a> {
    fn new(adjacency: &'a [Vec<usize>]) -> Self {
        let n = adjacency.len();
        Self {
            adjacency,
            member: vec![false; n],
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
        }
    }

    /// Strongly connected components of the subgraph induced by `nodes` that
    /// can hold a cycle: more than one node, or a single node with a self-loop.
    /// Each component is returned sorted.
    fn cyclic(&mut self, nodes: &[usize]) -> Vec<Vec<usize>> {
        let adjacency = self.adjacency;
        for &node in nodes {
            self.member[node] = true;
        }

        let mut components = Vec::new();
        let mut counter = 0;
        let mut stack = Vec::new();
        let mut call: Vec<(usize, usize)> = Vec::new();

        for &root in nodes {
            if self.index[root].is_some() {
                continue;
            }
            self.visit(root, &mut counter, &mut stack);
            call.push((root, 0));

            while let Some(frame) = call.last_mut() {
                let node = frame.0;
                if let Some(&next) = adjacency[node].get(frame.1) {
                    frame.1 += 1;
                    if !self.member[next] {
                        continue;
                    }
                    match self.index[next] {
                        None => {
                            self.visit(next, &mut counter, &mut stack);
                            call.push((next, 0));
                        }
                        Some(index) if self.on_stack[next] => {
                            self.lowlink[node] = self.lowlink[node].min(index);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                call.pop();
                if let Some(&(parent, _)) = call.last() {
                    self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[node]);
                }
                if self.index[node] == Some(self.lowlink[node]) {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        self.on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    if component.len() > 1 || adjacency[node].contains(&node) {
                        component.sort_unstable();
                        components.push(component);
                    }
                }
            }
        }

        for &node in nodes {
            self.member[node] = false;
            self.index[node] = None;
        }
        components
    }

    fn visit(&mut self, node: usize, counter: &mut usize, stack: &mut Vec<usize>) {
        self.index[node] = Some(*counter);
        self.lowlink[node] = *counter;
        *counter += 1;
        stack.push(node);
        self.on_stack[node] = true;
    }
}
