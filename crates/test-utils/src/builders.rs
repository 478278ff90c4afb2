#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use rundag::manifest::{ConfigSection, Manifest, NodeConfig, RawManifest};
use rundag::{DependencyGraph, NodeId};

/// Build a graph from `(dependency, dependent)` string pairs plus any
/// isolated nodes.
pub fn graph_from_edges(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
    DependencyGraph::from_edges(
        nodes.iter().copied(),
        edges.iter().map(|(a, b)| (NodeId::from(*a), NodeId::from(*b))),
    )
}

/// Set of node ids from string literals.
pub fn ids(names: &[&str]) -> BTreeSet<NodeId> {
    names.iter().map(|n| NodeId::from(*n)).collect()
}

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: RawManifest {
                config: ConfigSection::default(),
                node: BTreeMap::new(),
            },
        }
    }

    pub fn with_node(mut self, id: &str, node: NodeConfig) -> Self {
        self.manifest.node.insert(id.to_string(), node);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.manifest.config.threads = threads;
        self
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.manifest.config.fail_fast = val;
        self
    }

    pub fn build_raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            node: NodeConfig {
                cmd: cmd.to_string(),
                depends_on: vec![],
                tags: vec![],
                ephemeral: false,
                enabled: true,
            },
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.node.depends_on.push(dep.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.node.tags.push(tag.to_string());
        self
    }

    pub fn ephemeral(mut self, val: bool) -> Self {
        self.node.ephemeral = val;
        self
    }

    pub fn enabled(mut self, val: bool) -> Self {
        self.node.enabled = val;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
