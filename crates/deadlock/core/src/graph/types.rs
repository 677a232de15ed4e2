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

//! Node, edge and cycle types of the resource allocation graph

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

/// Identifier of a process node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a resource node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_id_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $ty {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

impl_id_conversions!(ProcessId);
impl_id_conversions!(ResourceId);

/// Any node of the graph. Processes order before resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NodeId {
    Process(ProcessId),
    Resource(ResourceId),
}

impl NodeId {
    pub fn is_process(&self) -> bool {
        matches!(self, NodeId::Process(_))
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, NodeId::Resource(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeId::Process(id) => id.as_str(),
            NodeId::Resource(id) => id.as_str(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Process waits for an instance of the resource (process -> resource)
    Request,
    /// Resource instance held by the process (resource -> process)
    Allocation,
}

/// A typed edge between a process and a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub process: ProcessId,
    pub resource: ResourceId,
}

impl Edge {
    /// Tail of the edge
    pub fn source(&self) -> NodeId {
        match self.kind {
            EdgeKind::Request => NodeId::Process(self.process.clone()),
            EdgeKind::Allocation => NodeId::Resource(self.resource.clone()),
        }
    }

    /// Head of the edge
    pub fn target(&self) -> NodeId {
        match self.kind {
            EdgeKind::Request => NodeId::Resource(self.resource.clone()),
            EdgeKind::Allocation => NodeId::Process(self.process.clone()),
        }
    }
}

/// Resource node as seen by external readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceInfo {
    pub id: ResourceId,
    pub instances: u32,
    /// One entry per held instance; a process may appear more than once
    pub holders: Vec<ProcessId>,
}

impl ResourceInfo {
    /// Instances not currently held
    pub fn free(&self) -> u32 {
        free_instances(self.instances, self.holders.len())
    }
}

/// Instances left once `held` are allocated, never below zero
pub(crate) fn free_instances(instances: u32, held: usize) -> u32 {
    instances.saturating_sub(u32::try_from(held).unwrap_or(u32::MAX))
}

/// A simple directed cycle, closed implicitly from the last node back to the first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycle(Vec<NodeId>);

impl Cycle {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether node kinds strictly alternate around the closed cycle
    pub fn is_alternating(&self) -> bool {
        let n = self.0.len();
        n > 0 && (0..n).all(|i| self.0[i].is_process() != self.0[(i + 1) % n].is_process())
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessId> {
        self.0.iter().filter_map(|node| match node {
            NodeId::Process(id) => Some(id),
            NodeId::Resource(_) => None,
        })
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceId> {
        self.0.iter().filter_map(|node| match node {
            NodeId::Resource(id) => Some(id),
            NodeId::Process(_) => None,
        })
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.0.contains(node)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.0 {
            write!(f, "{node} → ")?;
        }
        match self.0.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}
