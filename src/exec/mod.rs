// src/exec/mod.rs

//! Execution layer around the scheduler.
//!
//! - [`runner`]: the [`TaskRunner`] trait and the shell-backed
//!   [`CommandRunner`] used in production.
//! - [`pool`]: [`WorkerPool`], N blocking workers that loop
//!   `get` / run / `mark_done` and report on a results channel.
//! - [`summary`]: per-node results and the end-of-run [`RunSummary`].

pub mod pool;
pub mod runner;
pub mod summary;

pub use pool::{StopSignal, WorkerPool};
pub use runner::{CommandRunner, NodeOutcome, TaskRunner};
pub use summary::{NodeResult, NodeStatus, RunSummary};
