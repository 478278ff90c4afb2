// src/graph/mod.rs

//! DAG representation, scoring and selection.
//!
//! - [`dependency_graph`] holds the explicit adjacency-map DAG and the
//!   ancestor/descendant/subset operations on it.
//! - [`scorer`] assigns execution-priority levels by grouped topological sort.
//! - [`selector`] turns `--select` / `--exclude` strings into node-id sets.

pub mod dependency_graph;
pub mod scorer;
pub mod selector;

pub use dependency_graph::DependencyGraph;
pub use scorer::{LevelMap, LevelScorer};
pub use selector::{Selection, SelectionSpec};
