// src/errors.rs

//! Crate-wide error type.
//!
//! Construction-time errors (`Selection`, `Cycle`, manifest problems) are
//! meant to be handled where the run plan is built, before any node starts.
//! `Consistency` means the queue's shared invariants are already broken and
//! the whole run must abort.

use thiserror::Error;

use crate::types::NodeId;

#[derive(Error, Debug)]
pub enum RundagError {
    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Node not found in graph: {0}")]
    NodeNotFound(NodeId),

    #[error("Selected nodes do not exist in the graph: {}", format_ids(.missing))]
    Selection { missing: Vec<NodeId> },

    #[error("Cycle detected in DAG involving: {}", format_ids(.nodes))]
    Cycle { nodes: Vec<NodeId> },

    #[error("Queue consistency error: {0}")]
    Consistency(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, RundagError>;
