// src/plan.rs

//! Building a run plan: manifest -> graph -> selection -> subset -> queue.
//!
//! Every construction-time error (bad selector, unknown selected id, cycle)
//! surfaces from [`RunPlan::build`], before any node is started.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::Result;
use crate::graph::{DependencyGraph, Selection};
use crate::manifest::Manifest;
use crate::queue::ExecutionQueue;
use crate::types::NodeId;

/// Everything a worker pool needs for one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// The graph reduced to the selected nodes.
    pub graph: Arc<DependencyGraph>,
    pub queue: Arc<ExecutionQueue>,
}

impl RunPlan {
    /// Resolve `selection` against the manifest's graph and build a queue.
    ///
    /// Ephemeral nodes are never selected for execution; `subset` rewires
    /// their dependents onto their dependencies.
    pub fn build(manifest: &Manifest, selection: &Selection) -> Result<Self> {
        let full = manifest.dependency_graph();
        let mut selected = selection.resolve(&full, manifest)?;

        let before = selected.len();
        selected.retain(|id| manifest.is_executable(id));
        if selected.len() != before {
            debug!(
                dropped = before - selected.len(),
                "dropped non-executable (ephemeral) nodes from selection"
            );
        }

        Self::from_graph(&full, selected)
    }

    /// Build a plan directly from a project graph and a selected id set.
    pub fn from_graph(full: &DependencyGraph, selected: BTreeSet<NodeId>) -> Result<Self> {
        let reduced = full.subset(&selected)?;
        let queue = ExecutionQueue::new(reduced.clone(), selected)?;

        info!(
            project_nodes = full.len(),
            selected = reduced.len(),
            edges = reduced.edge_count(),
            "run plan built"
        );

        Ok(Self {
            graph: Arc::new(reduced),
            queue: Arc::new(queue),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Human-readable listing of the plan, one line per level.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let levels = self.queue.levels();
        out.push_str(&format!(
            "{} node(s), {} level(s), {} component(s)\n",
            levels.len(),
            levels.max_level().map_or(0, |l| l + 1),
            levels.component_count()
        ));
        for (level, group) in levels.groups().iter().enumerate() {
            let names: Vec<&str> = group.iter().map(|id| id.as_str()).collect();
            out.push_str(&format!("  level {level}: {}\n", names.join(", ")));
        }
        out
    }
}
