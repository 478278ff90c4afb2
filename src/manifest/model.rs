// src/manifest/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::graph::DependencyGraph;
use crate::registry::NodeRegistry;
use crate::types::{FailurePolicy, NodeId};

/// Project manifest exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// threads = 4
/// fail_fast = false
///
/// [node."seed.raw_orders"]
/// cmd = "./load.sh raw_orders"
/// tags = ["raw"]
///
/// [node."model.orders"]
/// cmd = "./build.sh orders"
/// depends_on = ["seed.raw_orders"]
/// ```
///
/// All sections are optional at parse time; [`Manifest::try_from`] enforces
/// the semantic rules.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    /// Run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All nodes from `[node.<id>]`, keyed by node id.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// Validated manifest. Only obtainable through `TryFrom<RawManifest>`, so
/// holders can rely on known dependencies and an acyclic enabled graph.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub config: ConfigSection,
    pub node: BTreeMap<String, NodeConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of worker threads. Must be >= 1.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Stop starting new nodes after the first failure.
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_threads() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            fail_fast: false,
        }
    }
}

impl ConfigSection {
    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::from_fail_fast(self.fail_fast)
    }
}

/// `[node.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Shell command that performs this node's work.
    ///
    /// May be omitted for ephemeral or disabled nodes, which never run.
    #[serde(default)]
    pub cmd: String,

    /// Ids of the nodes that must finish before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Free-form labels for `tag:` selectors.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Ephemeral nodes stay in the graph for dependency purposes but are
    /// never executed; selection cuts them out and rewires around them.
    #[serde(default)]
    pub ephemeral: bool,

    /// Disabled nodes are not part of the project graph at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NodeConfig {
    /// Whether this node ever gets handed to a worker.
    pub fn is_executable(&self) -> bool {
        self.enabled && !self.ephemeral
    }
}

impl Manifest {
    pub(crate) fn new_unchecked(config: ConfigSection, node: BTreeMap<String, NodeConfig>) -> Self {
        Self { config, node }
    }

    /// Enabled node ids, in id order.
    pub fn enabled_nodes(&self) -> impl Iterator<Item = &str> {
        self.node
            .iter()
            .filter(|(_, n)| n.enabled)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_executable(&self, node: &str) -> bool {
        self.node.get(node).is_some_and(NodeConfig::is_executable)
    }

    /// Full project DAG over enabled nodes; edge `dep -> node` for every
    /// `depends_on` entry.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let edges = self
            .node
            .iter()
            .filter(|(_, n)| n.enabled)
            .flat_map(|(id, n)| {
                n.depends_on
                    .iter()
                    .map(move |dep| (NodeId::new(dep), NodeId::new(id)))
            });
        DependencyGraph::from_edges(self.enabled_nodes(), edges)
    }
}

impl NodeRegistry for Manifest {
    type Payload = NodeConfig;

    fn resolve(&self, node: &str) -> Option<&NodeConfig> {
        self.node.get(node)
    }

    fn tags_of(&self, node: &str) -> &[String] {
        self.node
            .get(node)
            .map(|n| n.tags.as_slice())
            .unwrap_or(&[])
    }
}
