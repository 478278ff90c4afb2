// src/graph/selector.rs

//! Parsing and evaluation of `--select` / `--exclude` strings.
//!
//! Supported forms:
//!
//! ```text
//! model.orders        exact id or glob (`model.*`, `*orders*`)
//! tag:nightly         every node carrying the tag
//! +X   2+X            X plus all ancestors / ancestors up to depth 2
//! X+   X+1            X plus all descendants / descendants up to depth 1
//! @X                  X, its descendants, and every ancestor of those
//! ```

use std::collections::BTreeSet;
use std::sync::OnceLock;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{Result, RundagError};
use crate::graph::DependencyGraph;
use crate::registry::NodeRegistry;
use crate::types::NodeId;

const TAG_PREFIX: &str = "tag:";

fn selector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<at>@)?(?:(?P<up_depth>\d*)(?P<up>\+))?(?P<body>[^+@]+)(?:(?P<down>\+)(?P<down_depth>\d*))?$",
        )
        .expect("selector regex is valid")
    })
}

/// How a selector picks its starting nodes.
#[derive(Debug, Clone)]
enum SelectorMethod {
    Id(GlobMatcher),
    Tag(String),
}

/// A single parsed selection string.
#[derive(Debug, Clone)]
pub struct SelectionSpec {
    raw: String,
    method: SelectorMethod,
    /// `Some(depth)` if ancestors are included; inner `None` means unlimited.
    parents: Option<Option<usize>>,
    /// Same as `parents`, for descendants.
    children: Option<Option<usize>>,
    childrens_parents: bool,
}

impl SelectionSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let caps = selector_regex()
            .captures(trimmed)
            .ok_or_else(|| RundagError::InvalidSelector(raw.to_string()))?;

        let childrens_parents = caps.name("at").is_some();
        let parents = caps
            .name("up")
            .map(|_| parse_depth(raw, caps.name("up_depth").map(|m| m.as_str())))
            .transpose()?;
        let children = caps
            .name("down")
            .map(|_| parse_depth(raw, caps.name("down_depth").map(|m| m.as_str())))
            .transpose()?;

        if childrens_parents && (parents.is_some() || children.is_some()) {
            return Err(RundagError::InvalidSelector(format!(
                "{raw}: '@' cannot be combined with '+'"
            )));
        }

        let body = &caps["body"];
        let method = match body.strip_prefix(TAG_PREFIX) {
            Some(tag) if !tag.is_empty() => SelectorMethod::Tag(tag.to_string()),
            Some(_) => {
                return Err(RundagError::InvalidSelector(format!(
                    "{raw}: empty tag name"
                )));
            }
            None => {
                let glob = Glob::new(body)
                    .map_err(|e| RundagError::InvalidSelector(format!("{raw}: {e}")))?;
                SelectorMethod::Id(glob.compile_matcher())
            }
        };

        Ok(Self {
            raw: trimmed.to_string(),
            method,
            parents,
            children,
            childrens_parents,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate this selector against `graph`, consulting `registry` for tags.
    pub fn select<R: NodeRegistry>(
        &self,
        graph: &DependencyGraph,
        registry: &R,
    ) -> Result<BTreeSet<NodeId>> {
        let seeds: BTreeSet<NodeId> = graph
            .nodes()
            .filter(|id| match &self.method {
                SelectorMethod::Id(glob) => glob.is_match(id.as_str()),
                SelectorMethod::Tag(tag) => registry.tags_of(id).iter().any(|t| t == tag),
            })
            .cloned()
            .collect();

        let mut selected = seeds.clone();
        for seed in &seeds {
            if let Some(depth) = self.parents {
                selected.extend(graph.ancestors(seed, depth)?);
            }
            if let Some(depth) = self.children {
                selected.extend(graph.descendants(seed, depth)?);
            }
            if self.childrens_parents {
                let mut family = graph.descendants(seed, None)?;
                family.insert(seed.clone());
                for member in &family {
                    selected.extend(graph.ancestors(member, None)?);
                }
                selected.extend(family);
            }
        }

        if selected.is_empty() {
            warn!(selector = %self.raw, "selector matched no nodes");
        }
        debug!(selector = %self.raw, matched = selected.len(), "evaluated selector");

        Ok(selected)
    }
}

fn parse_depth(raw: &str, digits: Option<&str>) -> Result<Option<usize>> {
    match digits {
        None | Some("") => Ok(None),
        Some(d) => d
            .parse::<usize>()
            .map(Some)
            .map_err(|e| RundagError::InvalidSelector(format!("{raw}: bad depth '{d}': {e}"))),
    }
}

/// `--select` / `--exclude` lists combined.
///
/// The result is `union(select) - union(exclude)`; with no `select` selectors
/// every node in the graph is the starting point.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    select: Vec<SelectionSpec>,
    exclude: Vec<SelectionSpec>,
}

impl Selection {
    /// Select every node.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse<S: AsRef<str>>(select: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            select: select
                .iter()
                .map(|s| SelectionSpec::parse(s.as_ref()))
                .collect::<Result<_>>()?,
            exclude: exclude
                .iter()
                .map(|s| SelectionSpec::parse(s.as_ref()))
                .collect::<Result<_>>()?,
        })
    }

    pub fn resolve<R: NodeRegistry>(
        &self,
        graph: &DependencyGraph,
        registry: &R,
    ) -> Result<BTreeSet<NodeId>> {
        let mut selected: BTreeSet<NodeId> = if self.select.is_empty() {
            graph.nodes().cloned().collect()
        } else {
            let mut acc = BTreeSet::new();
            for selector in &self.select {
                acc.extend(selector.select(graph, registry)?);
            }
            acc
        };

        for selector in &self.exclude {
            for id in selector.select(graph, registry)? {
                selected.remove(&id);
            }
        }

        Ok(selected)
    }
}
