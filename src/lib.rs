// src/lib.rs

pub mod cli;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod manifest;
pub mod plan;
pub mod queue;
pub mod registry;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::exec::{CommandRunner, NodeStatus, RunSummary, StopSignal, WorkerPool};
use crate::graph::Selection;
use crate::manifest::load_and_validate;
use crate::plan::RunPlan;
use crate::types::FailurePolicy;

pub use crate::graph::{DependencyGraph, LevelMap, LevelScorer};
pub use crate::queue::{ExecutionQueue, WorkQueue};
pub use crate::types::NodeId;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading and validation
/// - selection and run-plan construction
/// - the worker pool with the shell command runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = Arc::new(load_and_validate(&manifest_path)?);

    let selection = Selection::parse(args.select.as_slice(), args.exclude.as_slice())?;
    let plan = RunPlan::build(&manifest, &selection)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    if plan.is_empty() {
        warn!("selection contains no executable nodes; nothing to do");
        return Ok(());
    }

    let threads = args.threads.unwrap_or(manifest.config.threads);
    if threads == 0 {
        bail!("--threads must be >= 1 (got 0)");
    }
    let policy = if args.fail_fast {
        FailurePolicy::FailFast
    } else {
        manifest.config.failure_policy()
    };

    // Ctrl-C -> stop handing out work; running nodes finish.
    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; waiting for running nodes to finish");
            stop.trigger();
        });
    }

    let runner = Arc::new(CommandRunner::new(Arc::clone(&manifest)));
    let pool = WorkerPool::new(threads, policy);
    let summary = pool
        .run(
            Arc::clone(&plan.queue),
            Arc::clone(&plan.graph),
            runner,
            stop,
        )
        .await?;

    print_summary(&summary);

    if !summary.is_success() {
        bail!(
            "run finished with {} failed, {} skipped, {} not started",
            summary.failed(),
            summary.skipped(),
            summary.not_started.len()
        );
    }

    info!("run completed successfully");
    Ok(())
}

/// Dry-run output: nodes grouped by execution level.
fn print_dry_run(plan: &RunPlan) {
    println!("rundag dry-run");
    print!("{}", plan.describe());
    debug!("dry-run complete (no execution)");
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Done. OK={} FAILED={} SKIPPED={} NOT_STARTED={}",
        summary.succeeded(),
        summary.failed(),
        summary.skipped(),
        summary.not_started.len()
    );
    for result in &summary.results {
        match &result.status {
            NodeStatus::Success => {}
            NodeStatus::Failed(msg) => println!("  FAILED  {}: {msg}", result.node),
            NodeStatus::Skipped { failed_upstream } => {
                println!("  SKIPPED {} (upstream {failed_upstream} failed)", result.node)
            }
        }
    }
    for node in &summary.not_started {
        println!("  NOT STARTED {node}");
    }
}
