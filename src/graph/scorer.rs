// src/graph/scorer.rs

//! Execution-priority levels via grouped topological sort.

use std::collections::{BTreeMap, HashMap};

use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::errors::{Result, RundagError};
use crate::graph::DependencyGraph;
use crate::types::NodeId;

/// Immutable `NodeId -> level` map produced by [`LevelScorer`].
///
/// Lower levels run earlier. Two nodes on the same level never share an edge,
/// so a level is "what could run in parallel at this point with unlimited
/// workers".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelMap {
    levels: HashMap<NodeId, usize>,
    components: usize,
}

impl LevelMap {
    pub fn level_of(&self, node: &str) -> Option<usize> {
        self.levels.get(node).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of weakly-connected components that were scored.
    pub fn component_count(&self) -> usize {
        self.components
    }

    pub fn max_level(&self) -> Option<usize> {
        self.levels.values().copied().max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, usize)> {
        self.levels.iter().map(|(id, lvl)| (id, *lvl))
    }

    /// Nodes grouped by level, level 0 first, ids sorted within a level.
    pub fn groups(&self) -> Vec<Vec<NodeId>> {
        let mut by_level: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for (id, lvl) in &self.levels {
            by_level.entry(*lvl).or_default().push(id.clone());
        }
        by_level
            .into_values()
            .map(|mut group| {
                group.sort();
                group
            })
            .collect()
    }
}

/// Assigns every node its distance from a zero-indegree root of its own
/// weakly-connected component.
///
/// Components are found ignoring edge direction, then each one runs Kahn's
/// algorithm emitting the whole zero-indegree frontier as one level at a
/// time. Levels from all components are merged into a single map; level 0 in
/// one component and level 0 in another are both "ready at the start".
pub struct LevelScorer;

impl LevelScorer {
    /// Score `graph`, failing with [`RundagError::Cycle`] if some component
    /// cannot be fully drained.
    pub fn score(graph: &DependencyGraph) -> Result<LevelMap> {
        let ids: Vec<&NodeId> = graph.nodes().collect();
        let index: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut components = UnionFind::<usize>::new(ids.len());
        for (from, to) in graph.edges() {
            components.union(index[from.as_str()], index[to.as_str()]);
        }

        // Node indices are visited in id order, so members stay sorted.
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, label) in components.into_labeling().into_iter().enumerate() {
            members.entry(label).or_default().push(i);
        }

        let mut levels: HashMap<NodeId, usize> = HashMap::with_capacity(ids.len());
        let mut stuck: Vec<NodeId> = Vec::new();

        for component in members.values() {
            let mut in_degree: HashMap<usize, usize> = component
                .iter()
                .map(|&i| (i, graph.dependencies_of(ids[i]).count()))
                .collect();

            let mut frontier: Vec<usize> = component
                .iter()
                .copied()
                .filter(|i| in_degree[i] == 0)
                .collect();
            let mut level = 0;
            let mut drained = 0;

            while !frontier.is_empty() {
                let mut next = Vec::new();
                for &i in &frontier {
                    levels.insert(ids[i].clone(), level);
                    drained += 1;
                    for dependent in graph.dependents_of(ids[i]) {
                        let j = index[dependent.as_str()];
                        if let Some(d) = in_degree.get_mut(&j) {
                            *d -= 1;
                            if *d == 0 {
                                next.push(j);
                            }
                        }
                    }
                }
                next.sort_unstable();
                frontier = next;
                level += 1;
            }

            if drained < component.len() {
                stuck.extend(
                    component
                        .iter()
                        .filter(|&&i| !levels.contains_key(ids[i].as_str()))
                        .map(|&i| ids[i].clone()),
                );
            }
        }

        if !stuck.is_empty() {
            stuck.sort();
            return Err(RundagError::Cycle { nodes: stuck });
        }

        let scored = LevelMap {
            levels,
            components: members.len(),
        };

        debug!(
            nodes = scored.len(),
            components = scored.component_count(),
            max_level = scored.max_level(),
            "scored dependency graph"
        );

        Ok(scored)
    }
}
