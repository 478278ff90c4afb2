// src/exec/runner.rs

//! Turning a node id into actual work.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::manifest::NodeConfig;
use crate::registry::NodeRegistry;
use crate::types::NodeId;

/// Outcome of running one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    Failed(String),
}

/// Executes a single node. Called from worker threads, possibly many at once.
///
/// Production code uses [`CommandRunner`]; tests plug in a fake that records
/// order and fails on demand.
pub trait TaskRunner: Send + Sync {
    fn run(&self, node: &NodeId) -> NodeOutcome;
}

/// Runs each node's `cmd` through the platform shell.
///
/// Task stdout is inherited so it shows up as-is; stderr is captured and
/// logged at debug level, and its last line is used as the failure message.
pub struct CommandRunner<R> {
    registry: Arc<R>,
}

impl<R> CommandRunner<R>
where
    R: NodeRegistry<Payload = NodeConfig> + Send + Sync,
{
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    fn run_inner(&self, node: &NodeId) -> Result<NodeOutcome> {
        let Some(cfg) = self.registry.resolve(node) else {
            return Ok(NodeOutcome::Failed(format!("node '{node}' is not in the registry")));
        };

        info!(node = %node, cmd = %cfg.cmd, "starting node");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&cfg.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&cfg.cmd);
            c
        };
        cmd.env("RUNDAG_NODE", node.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for node '{node}'"))?;

        let mut last_stderr = None;
        if let Some(stderr) = child.stderr.take() {
            for line in BufReader::new(stderr).lines() {
                let line = line.with_context(|| format!("reading stderr of node '{node}'"))?;
                debug!(node = %node, "stderr: {}", line);
                if !line.trim().is_empty() {
                    last_stderr = Some(line);
                }
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("waiting for process of node '{node}'"))?;

        if status.success() {
            return Ok(NodeOutcome::Success);
        }

        let code = status.code().unwrap_or(-1);
        let message = match last_stderr {
            Some(line) => format!("exit code {code}: {line}"),
            None => format!("exit code {code}"),
        };
        Ok(NodeOutcome::Failed(message))
    }
}

impl<R> TaskRunner for CommandRunner<R>
where
    R: NodeRegistry<Payload = NodeConfig> + Send + Sync,
{
    fn run(&self, node: &NodeId) -> NodeOutcome {
        self.run_inner(node)
            .unwrap_or_else(|err| NodeOutcome::Failed(format!("{err:#}")))
    }
}
