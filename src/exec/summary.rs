// src/exec/summary.rs

//! Per-node results and the end-of-run summary.

use std::time::Duration;

use crate::types::NodeId;

/// Final status of one node in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Success,
    Failed(String),
    /// Not executed because an upstream node failed.
    Skipped { failed_upstream: NodeId },
}

impl NodeStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, NodeStatus::Failed(_))
    }
}

/// One entry on the results channel.
#[derive(Debug, Clone)]
pub struct NodeResult {
    pub node: NodeId,
    pub status: NodeStatus,
    pub elapsed: Duration,
    pub worker: usize,
}

/// Everything that happened during one drain of the queue.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Results in completion order.
    pub results: Vec<NodeResult>,
    /// Selected nodes that were never handed out (fail-fast or cancellation).
    pub not_started: Vec<NodeId>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Success))
    }

    pub fn failed(&self) -> usize {
        self.count(NodeStatus::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Skipped { .. }))
    }

    /// `true` if every selected node ran and succeeded.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0 && self.not_started.is_empty()
    }

    /// Completion order of nodes, ignoring status.
    pub fn order(&self) -> Vec<NodeId> {
        self.results.iter().map(|r| r.node.clone()).collect()
    }

    pub fn status_of(&self, node: &str) -> Option<&NodeStatus> {
        self.results
            .iter()
            .find(|r| r.node.as_str() == node)
            .map(|r| &r.status)
    }

    fn count(&self, pred: impl Fn(&NodeStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}
