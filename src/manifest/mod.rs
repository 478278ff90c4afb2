// src/manifest/mod.rs

//! Project manifest: the registry of nodes and their dependencies.
//!
//! - [`model`]: TOML-backed data model; [`Manifest`] implements
//!   [`crate::registry::NodeRegistry`].
//! - [`loader`]: reads a manifest from disk.
//! - [`validate`]: rejects unknown dependencies, cycles and bad `[config]`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_manifest_path, load_and_validate, load_from_path};
pub use model::{ConfigSection, Manifest, NodeConfig, RawManifest};
pub use validate::validate_manifest;
