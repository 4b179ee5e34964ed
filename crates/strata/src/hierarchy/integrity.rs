//! Whole-forest consistency check.
//!
//! The engine never writes an inconsistent hierarchy, but the database can be
//! edited around it. This loads every parent link into a `petgraph` graph once
//! and reports what the per-operation checks would otherwise trip over.

use std::collections::{HashMap, VecDeque};

use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;

use crate::db::workstreams::Link;
use crate::types::{TenantId, WorkstreamId};

/// A node whose `parent_id` points at a missing workstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingParent {
    /// The orphaned node
    pub node: WorkstreamId,
    /// The missing parent id
    pub parent: WorkstreamId,
}

/// A node deeper than the configured maximum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthViolation {
    /// The offending node
    pub node: WorkstreamId,
    /// Its depth (root = 0)
    pub depth: u32,
}

/// A parent link crossing tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTenantLink {
    /// The child node
    pub node: WorkstreamId,
    /// Its parent
    pub parent: WorkstreamId,
    /// Tenant of the child
    pub node_tenant: TenantId,
    /// Tenant of the parent
    pub parent_tenant: TenantId,
}

/// Findings of [`crate::Strata::verify_integrity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Number of workstreams examined
    pub checked: usize,
    /// Each parent cycle, as the set of ids on it (sorted)
    pub cycles: Vec<Vec<WorkstreamId>>,
    /// Links to parents that do not exist
    pub dangling_parents: Vec<DanglingParent>,
    /// Nodes beyond `max_depth`
    pub depth_violations: Vec<DepthViolation>,
    /// Links whose endpoints belong to different tenants
    pub cross_tenant_links: Vec<CrossTenantLink>,
}

impl IntegrityReport {
    /// Returns `true` when nothing was found.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.cycles.is_empty()
            && self.dangling_parents.is_empty()
            && self.depth_violations.is_empty()
            && self.cross_tenant_links.is_empty()
    }

    /// Total number of findings.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.cycles.len()
            + self.dangling_parents.len()
            + self.depth_violations.len()
            + self.cross_tenant_links.len()
    }
}

/// Check a full set of links. Edges run parent -> child.
pub(crate) fn verify(links: &[Link], max_depth: u32) -> IntegrityReport {
    let mut graph: DiGraph<WorkstreamId, ()> = DiGraph::with_capacity(links.len(), links.len());
    let node_map: HashMap<WorkstreamId, NodeIndex> = links
        .iter()
        .map(|link| (link.id, graph.add_node(link.id)))
        .collect();
    let tenants: HashMap<WorkstreamId, &TenantId> =
        links.iter().map(|link| (link.id, &link.tenant)).collect();

    let mut report = IntegrityReport {
        checked: links.len(),
        ..IntegrityReport::default()
    };
    let mut roots = Vec::new();

    for link in links {
        let child = node_map[&link.id];
        let Some(parent) = link.parent else {
            roots.push(child);
            continue;
        };
        let Some(&parent_idx) = node_map.get(&parent) else {
            report.dangling_parents.push(DanglingParent {
                node: link.id,
                parent,
            });
            // Walk the orphan's subtree as if it were a root.
            roots.push(child);
            continue;
        };
        graph.add_edge(parent_idx, child, ());

        if let Some(&parent_tenant) = tenants.get(&parent)
            && parent_tenant != &link.tenant
        {
            report.cross_tenant_links.push(CrossTenantLink {
                node: link.id,
                parent,
                node_tenant: link.tenant.clone(),
                parent_tenant: parent_tenant.clone(),
            });
        }
    }

    for component in algo::tarjan_scc(&graph) {
        let is_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|&n| graph.contains_edge(n, n));
        if is_cycle {
            let mut ids: Vec<_> = component.iter().map(|&n| graph[n]).collect();
            ids.sort_unstable();
            report.cycles.push(ids);
        }
    }
    report.cycles.sort();

    // Breadth-first from every root; nodes on or under a cycle are never reached.
    let mut queue: VecDeque<(NodeIndex, u32)> = roots.into_iter().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = queue.pop_front() {
        if depth > max_depth {
            report.depth_violations.push(DepthViolation {
                node: graph[node],
                depth,
            });
        }
        for child in graph.neighbors_directed(node, Direction::Outgoing) {
            queue.push_back((child, depth + 1));
        }
    }
    report.depth_violations.sort_by_key(|v| v.node);

    report
}
