// src/exec/pool.rs

//! Fixed-size pool of blocking workers draining a [`WorkQueue`].

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, RundagError};
use crate::exec::runner::{NodeOutcome, TaskRunner};
use crate::exec::summary::{NodeResult, NodeStatus, RunSummary};
use crate::graph::DependencyGraph;
use crate::queue::WorkQueue;
use crate::types::{FailurePolicy, NodeId};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared "stop handing out work" flag.
///
/// Set by the pool itself on fail-fast or a queue consistency error, and by
/// the binary on Ctrl-C. Nodes already running are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    threads: usize,
    policy: FailurePolicy,
    poll_interval: Duration,
}

/// State shared by all workers of one run.
struct WorkerContext<Q: ?Sized, R: ?Sized> {
    queue: Arc<Q>,
    runner: Arc<R>,
    /// Immutable copy of the run graph, used to find what to skip.
    graph: Arc<DependencyGraph>,
    /// Node -> the failed upstream node that caused it to be skipped.
    skipped: Mutex<HashMap<NodeId, NodeId>>,
    policy: FailurePolicy,
    poll_interval: Duration,
    stop: StopSignal,
    results: mpsc::UnboundedSender<NodeResult>,
}

impl WorkerPool {
    pub fn new(threads: usize, policy: FailurePolicy) -> Self {
        Self {
            threads: threads.max(1),
            policy,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How long a worker waits in `get` before re-checking the stop signal.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Drain `queue` with `threads` blocking workers.
    ///
    /// `graph` must be the same reduced graph the queue was built from; it is
    /// only read, to compute which descendants to skip after a failure and
    /// which nodes never started.
    ///
    /// Node failures end up in the returned summary. A queue consistency
    /// error stops every worker and is returned as `Err`.
    pub async fn run<Q, R>(
        &self,
        queue: Arc<Q>,
        graph: Arc<DependencyGraph>,
        runner: Arc<R>,
        stop: StopSignal,
    ) -> Result<RunSummary>
    where
        Q: WorkQueue + ?Sized + 'static,
        R: TaskRunner + ?Sized + 'static,
    {
        let total = graph.len();
        let (tx, mut rx) = mpsc::unbounded_channel::<NodeResult>();

        let ctx = Arc::new(WorkerContext {
            queue,
            runner,
            graph: Arc::clone(&graph),
            skipped: Mutex::new(HashMap::new()),
            policy: self.policy,
            poll_interval: self.poll_interval,
            stop: stop.clone(),
            results: tx,
        });

        info!(
            threads = self.threads,
            nodes = total,
            policy = ?self.policy,
            "starting worker pool"
        );

        let mut handles = Vec::with_capacity(self.threads);
        for worker in 0..self.threads {
            let ctx = Arc::clone(&ctx);
            handles.push(tokio::task::spawn_blocking(move || worker_loop(worker, &*ctx)));
        }
        // Workers hold the only senders now, so `recv` ends when they all exit.
        drop(ctx);

        let mut summary = RunSummary::default();
        while let Some(result) = rx.recv().await {
            log_result(&result, summary.results.len() + 1, total);
            summary.results.push(result);
        }

        let mut first_err = None;
        for handle in handles {
            let err = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(join_err) => RundagError::Other(anyhow::Error::from(join_err)),
            };
            error!(error = %err, "worker aborted");
            first_err.get_or_insert(err);
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        let finished: BTreeSet<&NodeId> = summary.results.iter().map(|r| &r.node).collect();
        summary.not_started = graph
            .nodes()
            .filter(|id| !finished.contains(id))
            .cloned()
            .collect();

        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            not_started = summary.not_started.len(),
            "worker pool finished"
        );

        Ok(summary)
    }
}

fn worker_loop<Q, R>(worker: usize, ctx: &WorkerContext<Q, R>) -> Result<()>
where
    Q: WorkQueue + ?Sized,
    R: TaskRunner + ?Sized,
{
    debug!(worker, "worker started");

    loop {
        if ctx.stop.is_triggered() {
            debug!(worker, "stop requested; worker exiting");
            break;
        }
        if ctx.queue.is_empty() {
            debug!(worker, "no startable work left; worker exiting");
            break;
        }
        let Some(node) = ctx.queue.get(true, Some(ctx.poll_interval)) else {
            continue;
        };

        let started = Instant::now();
        let status = match ctx.skip_cause(&node) {
            Some(failed_upstream) => NodeStatus::Skipped { failed_upstream },
            None => match ctx.runner.run(&node) {
                NodeOutcome::Success => NodeStatus::Success,
                NodeOutcome::Failed(msg) => NodeStatus::Failed(msg),
            },
        };

        // Skips must be recorded before `mark_done` can unblock descendants.
        if status.is_failure() {
            ctx.on_failure(&node);
        }

        if let Err(err) = ctx.queue.mark_done(&node) {
            ctx.stop.trigger();
            return Err(err);
        }

        let _ = ctx.results.send(NodeResult {
            node,
            status,
            elapsed: started.elapsed(),
            worker,
        });
    }

    Ok(())
}

impl<Q: ?Sized, R: ?Sized> WorkerContext<Q, R> {
    fn skip_cause(&self, node: &str) -> Option<NodeId> {
        self.skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node)
            .cloned()
    }

    fn on_failure(&self, node: &NodeId) {
        match self.policy {
            FailurePolicy::FailFast => {
                warn!(node = %node, "node failed; fail-fast stops scheduling new work");
                self.stop.trigger();
            }
            FailurePolicy::BestEffort => {
                let downstream = self.graph.descendants(node, None).unwrap_or_default();
                if !downstream.is_empty() {
                    warn!(
                        node = %node,
                        skipped = downstream.len(),
                        "node failed; skipping its descendants"
                    );
                }
                let mut skipped = self.skipped.lock().unwrap_or_else(PoisonError::into_inner);
                for id in downstream {
                    skipped.entry(id).or_insert_with(|| node.clone());
                }
            }
        }
    }
}

fn log_result(result: &NodeResult, done: usize, total: usize) {
    let elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX);
    match &result.status {
        NodeStatus::Success => info!(
            node = %result.node,
            worker = result.worker,
            elapsed_ms,
            "[{done}/{total}] OK"
        ),
        NodeStatus::Failed(msg) => error!(
            node = %result.node,
            worker = result.worker,
            elapsed_ms,
            error = %msg,
            "[{done}/{total}] FAILED"
        ),
        NodeStatus::Skipped { failed_upstream } => warn!(
            node = %result.node,
            failed_upstream = %failed_upstream,
            "[{done}/{total}] SKIPPED"
        ),
    }
}
