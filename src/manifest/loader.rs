// src/manifest/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::manifest::model::{Manifest, RawManifest};

/// Read a manifest from `path` without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let manifest: RawManifest = toml::from_str(&contents)?;

    debug!(path = %path.display(), nodes = manifest.node.len(), "parsed manifest");
    Ok(manifest)
}

/// Read and validate a manifest: unknown or disabled dependencies, cycles and
/// `[config]` sanity are all rejected here.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let raw = load_from_path(&path)?;
    Manifest::try_from(raw)
}

/// Manifest used when `--manifest` is not given.
pub fn default_manifest_path() -> PathBuf {
    PathBuf::from("rundag.toml")
}
