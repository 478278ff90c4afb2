// src/registry.rs

//! Node id -> task payload resolution.
//!
//! The scheduler itself never looks at payloads; only the worker pool (to
//! run a node) and the selector (to match tags) go through this trait.

/// Anything that can turn a node id into the work it stands for.
pub trait NodeRegistry {
    type Payload;

    /// Payload for `node`, or `None` if the registry does not know it.
    fn resolve(&self, node: &str) -> Option<&Self::Payload>;

    /// Tags attached to `node`, used by `tag:` selectors.
    fn tags_of(&self, _node: &str) -> &[String] {
        &[]
    }
}
