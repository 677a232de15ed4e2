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

//! Resource Allocation Graph
//!
//! A bipartite directed graph of processes and resources. A request edge
//! `P -> R` means P waits for an instance of R; an allocation edge `R -> P`
//! means P holds one instance of R. A resource may have several allocation
//! edges, one per held instance, up to its instance count.
//!
//! Nodes are kept in ordered maps so that iteration, edge lists and cycle
//! output are deterministic: processes first, each group ordered by id.

use std::collections::{BTreeMap, BTreeSet};

use deadlock_common::{GraphError, GraphResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::cycles::simple_cycles;
use super::types::{Cycle, Edge, EdgeKind, NodeId, ProcessId, ResourceId, ResourceInfo, free_instances};

#[derive(Debug, Clone)]
struct ResourceNode {
    instances: u32,
    /// One entry per held instance (multiset)
    holders: Vec<ProcessId>,
}

impl ResourceNode {
    fn new(instances: u32) -> Self {
        Self { instances, holders: Vec::new() }
    }

    fn is_exhausted(&self) -> bool {
        self.holders.len() >= self.instances as usize
    }

    fn info(&self, id: &ResourceId) -> ResourceInfo {
        ResourceInfo {
            id: id.clone(),
            instances: self.instances,
            holders: self.holders.clone(),
        }
    }
}

/// Read-only copy of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub processes: Vec<ProcessId>,
    pub resources: Vec<ResourceInfo>,
    pub edges: Vec<Edge>,
}

/// Resource allocation graph over named processes and resources
#[derive(Debug, Clone, Default)]
pub struct ResourceAllocationGraph {
    /// Process -> resources it requests
    processes: BTreeMap<ProcessId, BTreeSet<ResourceId>>,
    /// Resource -> instance count and holders
    resources: BTreeMap<ResourceId, ResourceNode>,
    /// Register unknown endpoints on first edge use instead of failing
    auto_register: bool,
}

impl ResourceAllocationGraph {
    /// Create an empty graph that rejects edges to unregistered nodes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with explicit auto-registration behavior.
    ///
    /// With auto-registration on, edge operations create missing processes
    /// and single-instance resources. Every such creation is logged as a
    /// warning since it usually means a misspelled id.
    pub fn with_auto_register(auto_register: bool) -> Self {
        Self {
            auto_register,
            ..Self::default()
        }
    }

    pub fn auto_register(&self) -> bool {
        self.auto_register
    }

    /// Register a process
    pub fn add_process(&mut self, id: impl Into<ProcessId>) -> GraphResult<()> {
        let id = id.into();
        if self.processes.contains_key(&id) {
            return Err(GraphError::DuplicateEntity(id.to_string()));
        }
        debug!(process = %id, "Process added");
        self.processes.insert(id, BTreeSet::new());
        Ok(())
    }

    /// Register a resource with `instances` interchangeable units.
    ///
    /// The count arrives signed so that callers passing through unchecked
    /// input get `InvalidInstanceCount` rather than a wrapped value.
    pub fn add_resource(&mut self, id: impl Into<ResourceId>, instances: i64) -> GraphResult<()> {
        let id = id.into();
        if self.resources.contains_key(&id) {
            return Err(GraphError::DuplicateEntity(id.to_string()));
        }
        let count = match u32::try_from(instances) {
            Ok(count) if count >= 1 => count,
            _ => {
                return Err(GraphError::InvalidInstanceCount {
                    resource: id.to_string(),
                    count: instances,
                });
            }
        };
        debug!(resource = %id, instances = count, "Resource added");
        self.resources.insert(id, ResourceNode::new(count));
        Ok(())
    }

    /// Add a request edge `process -> resource`. Adding an existing request
    /// edge is a no-op.
    pub fn request_edge(&mut self, process: &str, resource: &str) -> GraphResult<()> {
        self.ensure_endpoints(process, resource)?;
        let requests = self.processes.get_mut(process).ok_or_else(|| GraphError::UnknownEntity(process.to_string()))?;
        if requests.insert(ResourceId::from(resource)) {
            debug!(process, resource, "Request edge added");
        }
        Ok(())
    }

    /// Add an allocation edge `resource -> process`, taking one instance
    pub fn allocation_edge(&mut self, resource: &str, process: &str) -> GraphResult<()> {
        if let Some(node) = self.resources.get(resource) {
            if node.is_exhausted() {
                return Err(GraphError::InstancesExhausted {
                    resource: resource.to_string(),
                    instances: node.instances,
                });
            }
        }
        self.ensure_endpoints(process, resource)?;
        let node = self.resources.get_mut(resource).ok_or_else(|| GraphError::UnknownEntity(resource.to_string()))?;
        node.holders.push(ProcessId::from(process));
        debug!(resource, process, held = node.holders.len(), instances = node.instances, "Allocation edge added");
        Ok(())
    }

    /// Remove the request edge `process -> resource` if present
    pub fn remove_request_edge(&mut self, process: &str, resource: &str) {
        if let Some(requests) = self.processes.get_mut(process) {
            if requests.remove(resource) {
                debug!(process, resource, "Request edge removed");
            }
        }
    }

    /// Remove one allocation edge `resource -> process` if present, freeing
    /// one instance
    pub fn remove_allocation_edge(&mut self, resource: &str, process: &str) {
        if let Some(node) = self.resources.get_mut(resource) {
            if let Some(index) = node.holders.iter().position(|holder| holder.as_str() == process) {
                node.holders.remove(index);
                debug!(resource, process, "Allocation edge removed");
            }
        }
    }

    /// Look for circular waits.
    ///
    /// Enumerates every simple cycle and keeps those that alternate between
    /// processes and resources. A cycle is equivalent to deadlock only when
    /// every resource has a single instance; with multi-instance resources
    /// it is necessary but not sufficient (see `DetectionStrategy::Reduction`).
    ///
    /// Cost can be exponential in the number of edges for dense graphs.
    pub fn detect_deadlock(&self) -> (bool, Vec<Cycle>) {
        let cycles = self.find_cycles(None);
        if !cycles.is_empty() {
            info!(cycles = cycles.len(), "Deadlock cycles found");
        }
        (!cycles.is_empty(), cycles)
    }

    /// Alternating simple cycles, at most `limit` of them
    pub fn find_cycles(&self, limit: Option<usize>) -> Vec<Cycle> {
        let nodes = self.nodes();
        let adjacency = self.adjacency(&nodes);
        let cycles: Vec<Cycle> = simple_cycles(&adjacency, limit)
            .into_iter()
            .map(|indices| Cycle::new(indices.into_iter().map(|i| nodes[i].clone()).collect()))
            .filter(Cycle::is_alternating)
            .collect();
        debug!(nodes = nodes.len(), cycles = cycles.len(), "Cycle enumeration finished");
        cycles
    }

    pub fn contains_process(&self, id: &str) -> bool {
        self.processes.contains_key(id)
    }

    pub fn contains_resource(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Registered processes in id order
    pub fn processes(&self) -> impl Iterator<Item = &ProcessId> {
        self.processes.keys()
    }

    /// Registered resources in id order
    pub fn resources(&self) -> impl Iterator<Item = ResourceInfo> + '_ {
        self.resources.iter().map(|(id, node)| node.info(id))
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn instances(&self, resource: &str) -> Option<u32> {
        self.resources.get(resource).map(|node| node.instances)
    }

    /// Instances of `resource` not currently allocated
    pub fn free_instances(&self, resource: &str) -> Option<u32> {
        self.resources.get(resource).map(|node| free_instances(node.instances, node.holders.len()))
    }

    /// Whether every resource has exactly one instance
    pub fn is_single_instance(&self) -> bool {
        self.resources.values().all(|node| node.instances == 1)
    }

    /// Resources `process` is waiting for
    pub fn requests_of(&self, process: &str) -> Option<&BTreeSet<ResourceId>> {
        self.processes.get(process)
    }

    /// Number of instances of `resource` held by `process`
    pub fn held_by(&self, resource: &str, process: &str) -> usize {
        self.resources
            .get(resource)
            .map_or(0, |node| node.holders.iter().filter(|holder| holder.as_str() == process).count())
    }

    /// All edges, request edges first; allocation edges repeat per held instance
    pub fn edges(&self) -> Vec<Edge> {
        let requests = self.processes.iter().flat_map(|(process, requests)| {
            requests.iter().map(move |resource| Edge {
                kind: EdgeKind::Request,
                process: process.clone(),
                resource: resource.clone(),
            })
        });
        let allocations = self.resources.iter().flat_map(|(resource, node)| {
            node.holders.iter().map(move |process| Edge {
                kind: EdgeKind::Allocation,
                process: process.clone(),
                resource: resource.clone(),
            })
        });
        requests.chain(allocations).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.processes.values().map(BTreeSet::len).sum::<usize>() + self.resources.values().map(|node| node.holders.len()).sum::<usize>()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            processes: self.processes.keys().cloned().collect(),
            resources: self.resources().collect(),
            edges: self.edges(),
        }
    }

    fn ensure_endpoints(&mut self, process: &str, resource: &str) -> GraphResult<()> {
        let process_known = self.processes.contains_key(process);
        let resource_known = self.resources.contains_key(resource);

        if !self.auto_register {
            if !process_known {
                return Err(GraphError::UnknownEntity(process.to_string()));
            }
            if !resource_known {
                return Err(GraphError::UnknownEntity(resource.to_string()));
            }
            return Ok(());
        }

        if !process_known {
            warn!(process, "Auto-registering unknown process");
            self.processes.insert(ProcessId::from(process), BTreeSet::new());
        }
        if !resource_known {
            warn!(resource, "Auto-registering unknown resource with one instance");
            self.resources.insert(ResourceId::from(resource), ResourceNode::new(1));
        }
        Ok(())
    }

    /// All nodes in iteration order: processes, then resources
    fn nodes(&self) -> Vec<NodeId> {
        self.processes
            .keys()
            .cloned()
            .map(NodeId::Process)
            .chain(self.resources.keys().cloned().map(NodeId::Resource))
            .collect()
    }

    /// Adjacency over indices into `nodes`; repeated allocation edges collapse
    fn adjacency(&self, nodes: &[NodeId]) -> Vec<Vec<usize>> {
        let process_count = self.processes.len();
        let resource_index: BTreeMap<&ResourceId, usize> = self.resources.keys().enumerate().map(|(i, id)| (id, process_count + i)).collect();
        let process_index: BTreeMap<&ProcessId, usize> = self.processes.keys().enumerate().map(|(i, id)| (id, i)).collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (i, requests) in self.processes.values().enumerate() {
            adjacency[i] = requests.iter().filter_map(|resource| resource_index.get(resource).copied()).collect();
        }
        for (i, node) in self.resources.values().enumerate() {
            let targets: BTreeSet<usize> = node.holders.iter().filter_map(|process| process_index.get(process).copied()).collect();
            adjacency[process_count + i] = targets.into_iter().collect();
        }
        adjacency
    }
}
