use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use rundag::NodeId;
use rundag::exec::{NodeOutcome, TaskRunner};

/// A fake runner that:
/// - records which nodes were run, in start order
/// - fails the nodes it was told to fail
/// - optionally sleeps per node, to give other workers a chance to interleave.
#[derive(Default)]
pub struct FakeRunner {
    failing: HashSet<String>,
    delay: Option<Duration>,
    started: Mutex<Vec<NodeId>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, node: &str) -> Self {
        self.failing.insert(node.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Nodes passed to `run`, in call order.
    pub fn started(&self) -> Vec<NodeId> {
        self.started.lock().unwrap().clone()
    }

    pub fn started_names(&self) -> Vec<String> {
        self.started().iter().map(|id| id.to_string()).collect()
    }
}

impl TaskRunner for FakeRunner {
    fn run(&self, node: &NodeId) -> NodeOutcome {
        self.started.lock().unwrap().push(node.clone());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.contains(node.as_str()) {
            NodeOutcome::Failed(format!("{node} was told to fail"))
        } else {
            NodeOutcome::Success
        }
    }
}
