// src/graph/dependency_graph.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::errors::{Result, RundagError};
use crate::types::NodeId;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DagNode {
    /// Direct dependencies: nodes that must be done before this one can start.
    deps: BTreeSet<NodeId>,
    /// Direct dependents: nodes that list this one as a dependency.
    dependents: BTreeSet<NodeId>,
}

/// Explicit in-memory DAG keyed by [`NodeId`].
///
/// An edge `a -> b` means "`b` depends on `a`", so `a` must finish first.
/// Both directions are stored so that ancestor and descendant walks, and the
/// rewiring done by [`DependencyGraph::subset`], are cheap.
///
/// Acyclicity is *not* checked here; it is verified when levels are computed
/// (see [`crate::graph::LevelScorer`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<NodeId, DagNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a list of nodes and `(dependency, dependent)` edges.
    ///
    /// Edge endpoints that are not in `nodes` are added as well.
    pub fn from_edges<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator,
        N::Item: Into<NodeId>,
        E: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    /// Add a node with no edges. Adding an existing node is a no-op.
    pub fn add_node(&mut self, node: impl Into<NodeId>) {
        self.nodes.entry(node.into()).or_default();
    }

    /// Add the edge `from -> to` (`to` depends on `from`), creating missing
    /// endpoints.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) {
        let from = from.into();
        let to = to.into();
        self.nodes
            .entry(from.clone())
            .or_default()
            .dependents
            .insert(to.clone());
        self.nodes.entry(to).or_default().deps.insert(from);
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.dependents.len()).sum()
    }

    /// All node ids, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// All `(dependency, dependent)` edges.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.nodes
            .iter()
            .flat_map(|(id, n)| n.dependents.iter().map(move |d| (id, d)))
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.nodes
            .get(from)
            .is_some_and(|n| n.dependents.contains(to))
    }

    /// Immediate dependencies of a node. Empty for unknown nodes.
    pub fn dependencies_of(&self, node: &str) -> impl Iterator<Item = &NodeId> {
        self.nodes.get(node).into_iter().flat_map(|n| n.deps.iter())
    }

    /// Immediate dependents of a node. Empty for unknown nodes.
    pub fn dependents_of(&self, node: &str) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .get(node)
            .into_iter()
            .flat_map(|n| n.dependents.iter())
    }

    /// Number of unresolved dependencies of `node`.
    pub fn in_degree(&self, node: &str) -> Result<usize> {
        self.get(node).map(|n| n.deps.len())
    }

    /// Nodes with no unresolved dependencies, in id order.
    pub fn roots(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(id, _)| id)
    }

    /// Every node with a path to `node`, optionally limited to `max_depth`
    /// hops. `node` itself is not included.
    pub fn ancestors(&self, node: &str, max_depth: Option<usize>) -> Result<BTreeSet<NodeId>> {
        self.get(node)?;
        Ok(self.walk(node, max_depth, |n| &n.deps))
    }

    /// Every node reachable from `node`, optionally limited to `max_depth`
    /// hops. `node` itself is not included.
    pub fn descendants(&self, node: &str, max_depth: Option<usize>) -> Result<BTreeSet<NodeId>> {
        self.get(node)?;
        Ok(self.walk(node, max_depth, |n| &n.dependents))
    }

    /// Reduce the graph to exactly `selected`, preserving reachability.
    ///
    /// Every excluded node is cut out by connecting each of its dependencies
    /// directly to each of its dependents. A rewired edge whose endpoints
    /// coincide is dropped rather than turned into a self-dependency.
    ///
    /// Fails with [`RundagError::Selection`] if any selected id is not in
    /// this graph.
    pub fn subset(&self, selected: &BTreeSet<NodeId>) -> Result<DependencyGraph> {
        let missing: Vec<NodeId> = selected
            .iter()
            .filter(|id| !self.nodes.contains_key(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RundagError::Selection { missing });
        }

        let mut reduced = self.clone();
        let excluded: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !selected.contains(*id))
            .cloned()
            .collect();

        for node in &excluded {
            let Some(cut) = reduced.nodes.get(node.as_str()).cloned() else {
                continue;
            };
            for dep in &cut.deps {
                for dependent in &cut.dependents {
                    if dep != dependent {
                        reduced.add_edge(dep.clone(), dependent.clone());
                    }
                }
            }
            reduced.remove_node(node)?;
        }

        debug!(
            selected = selected.len(),
            excluded = excluded.len(),
            edges = reduced.edge_count(),
            "reduced dependency graph to selection"
        );

        Ok(reduced)
    }

    /// Delete `node` and all incident edges.
    ///
    /// Returns the node's former dependents so callers can check which of
    /// them just lost their last dependency.
    pub fn remove_node(&mut self, node: &str) -> Result<BTreeSet<NodeId>> {
        let removed = self
            .nodes
            .remove(node)
            .ok_or_else(|| {
                RundagError::Consistency(format!("cannot remove unknown node '{node}'"))
            })?;

        for dep in &removed.deps {
            if let Some(n) = self.nodes.get_mut(dep.as_str()) {
                n.dependents.remove(node);
            }
        }
        for dependent in &removed.dependents {
            if let Some(n) = self.nodes.get_mut(dependent.as_str()) {
                n.deps.remove(node);
            }
        }

        Ok(removed.dependents)
    }

    fn get(&self, node: &str) -> Result<&DagNode> {
        self.nodes
            .get(node)
            .ok_or_else(|| RundagError::NodeNotFound(NodeId::new(node)))
    }

    /// Breadth-first walk along `next` edges, so the first time a node is
    /// seen is also its shortest distance from `start`.
    fn walk<F>(&self, start: &str, max_depth: Option<usize>, next: F) -> BTreeSet<NodeId>
    where
        F: Fn(&DagNode) -> &BTreeSet<NodeId>,
    {
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut frontier: VecDeque<(&str, usize)> = VecDeque::from([(start, 0)]);

        while let Some((current, depth)) = frontier.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let Some(n) = self.nodes.get(current) else {
                continue;
            };
            for neighbour in next(n) {
                if neighbour.as_str() != start && seen.insert(neighbour.clone()) {
                    frontier.push_back((neighbour.as_str(), depth + 1));
                }
            }
        }

        seen
    }
}
