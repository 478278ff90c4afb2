// src/manifest/validate.rs

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, RundagError};
use crate::manifest::model::{Manifest, RawManifest};
use crate::types::NodeId;

impl TryFrom<RawManifest> for Manifest {
    type Error = RundagError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.config, raw.node))
    }
}

/// Run every manifest check without consuming it.
pub fn validate_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_nodes(raw)?;
    validate_global_config(raw)?;
    validate_node_commands(raw)?;
    validate_dependencies(raw)?;
    validate_dag(raw)?;
    Ok(())
}

fn ensure_has_nodes(raw: &RawManifest) -> Result<()> {
    if raw.node.is_empty() {
        return Err(RundagError::ManifestError(
            "manifest must contain at least one [node.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(raw: &RawManifest) -> Result<()> {
    if raw.config.threads == 0 {
        return Err(RundagError::ManifestError(
            "[config].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_node_commands(raw: &RawManifest) -> Result<()> {
    for (id, node) in raw.node.iter() {
        if node.is_executable() && node.cmd.trim().is_empty() {
            return Err(RundagError::ManifestError(format!(
                "node '{id}' is executable but has an empty `cmd`"
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(raw: &RawManifest) -> Result<()> {
    for (id, node) in raw.node.iter() {
        for dep in node.depends_on.iter() {
            let Some(target) = raw.node.get(dep) else {
                return Err(RundagError::ManifestError(format!(
                    "node '{id}' has unknown dependency '{dep}' in `depends_on`"
                )));
            };
            if dep == id {
                return Err(RundagError::ManifestError(format!(
                    "node '{id}' cannot depend on itself in `depends_on`"
                )));
            }
            if node.enabled && !target.enabled {
                return Err(RundagError::ManifestError(format!(
                    "node '{id}' depends on disabled node '{dep}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(raw: &RawManifest) -> Result<()> {
    // Edge direction: dep -> node, over enabled nodes only.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (id, node) in raw.node.iter() {
        if node.enabled {
            graph.add_node(id.as_str());
        }
    }
    for (id, node) in raw.node.iter().filter(|(_, n)| n.enabled) {
        for dep in node.depends_on.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let culprit = cycle.node_id();
            let mut nodes: Vec<NodeId> = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&culprit))
                .unwrap_or_else(|| vec![culprit])
                .into_iter()
                .map(NodeId::new)
                .collect();
            nodes.sort();
            Err(RundagError::Cycle { nodes })
        }
    }
}
