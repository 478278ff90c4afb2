// src/queue/mod.rs

//! Shared ready-queue that worker threads pull from.
//!
//! - [`WorkQueue`] is the narrow interface the worker pool depends on.
//! - [`execution_queue`] holds the in-process implementation,
//!   [`ExecutionQueue`], which owns the live graph behind a single lock.

pub mod execution_queue;

use std::time::Duration;

use crate::errors::Result;
use crate::types::NodeId;

pub use execution_queue::ExecutionQueue;

/// Operations a worker loop needs from a scheduling queue.
///
/// Every method is safe to call from any number of threads at once.
pub trait WorkQueue: Send + Sync {
    /// Take the highest-priority ready node and mark it in progress.
    ///
    /// With `block = true` this waits (up to `timeout`, if given) while
    /// nothing is ready but some node is still waiting on dependencies.
    /// Returns `None` when nothing was handed out, including when no
    /// startable work remains at all.
    fn get(&self, block: bool, timeout: Option<Duration>) -> Option<NodeId>;

    /// Report that a node handed out by [`WorkQueue::get`] has finished,
    /// successfully or not.
    fn mark_done(&self, node: &str) -> Result<()>;

    /// `true` once every remaining node has been handed out.
    fn is_empty(&self) -> bool;

    /// Number of nodes not yet handed out (ready or still waiting).
    fn len(&self) -> usize;

    /// Block until every node has been reported done.
    fn join(&self);
}
