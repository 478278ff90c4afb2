// src/queue/execution_queue.rs

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::errors::{Result, RundagError};
use crate::graph::{DependencyGraph, LevelMap, LevelScorer};
use crate::queue::WorkQueue;
use crate::types::NodeId;

/// Ordering key of a ready node: lowest level first, then discovery order.
type ReadyEntry = Reverse<(usize, u64, NodeId)>;

/// Mutable state, only ever touched with the queue lock held.
///
/// Every node of `graph` is in exactly one of: `queued`, `in_progress`, or
/// neither (still waiting on a dependency). Done nodes are removed from the
/// graph.
#[derive(Debug)]
struct QueueState {
    graph: DependencyGraph,
    ready: BinaryHeap<ReadyEntry>,
    queued: HashSet<NodeId>,
    in_progress: HashSet<NodeId>,
    next_seq: u64,
    /// Bumped on every `mark_done`.
    done_count: u64,
}

impl QueueState {
    fn enqueue(&mut self, node: NodeId, level: usize) {
        if self.queued.insert(node.clone()) {
            debug!(node = %node, level, "node ready");
            self.ready.push(Reverse((level, self.next_seq, node)));
            self.next_seq += 1;
        }
    }

    fn pop_ready(&mut self) -> Option<NodeId> {
        let Reverse((level, _, node)) = self.ready.pop()?;
        self.queued.remove(&node);
        self.in_progress.insert(node.clone());
        debug!(node = %node, level, in_progress = self.in_progress.len(), "handing out node");
        Some(node)
    }

    fn startable(&self) -> usize {
        self.graph.len() - self.in_progress.len()
    }

    /// Nodes that are neither ready nor running, i.e. still have unmet deps.
    fn waiting(&self) -> usize {
        self.startable() - self.queued.len()
    }
}

/// Thread-safe priority queue over a dependency graph.
///
/// Construction scores the graph once with [`LevelScorer`] and seeds the
/// ready set with every zero-indegree node. Workers then loop
/// [`get`](WorkQueue::get) / [`mark_done`](WorkQueue::mark_done). Completing
/// a node removes it from the graph and, before `mark_done` returns, queues
/// every dependent whose last dependency it was.
///
/// All reads of the live graph go through the same lock as the mutations;
/// only the level map and the selected set, which never change, are read
/// without it.
#[derive(Debug)]
pub struct ExecutionQueue {
    state: Mutex<QueueState>,
    /// Signalled when nodes become ready or the last waiting node disappears.
    ready_cv: Condvar,
    /// Signalled on every `mark_done`.
    done_cv: Condvar,
    levels: LevelMap,
    selected: BTreeSet<NodeId>,
}

impl ExecutionQueue {
    /// Build a queue over `graph`, which should already be reduced to the
    /// nodes of this run. `selected` is kept as an immutable record of what
    /// the run intended to execute.
    ///
    /// Fails with [`RundagError::Selection`] if a selected id is not in
    /// `graph`, with [`RundagError::Consistency`] if `graph` holds nodes
    /// outside `selected`, and with [`RundagError::Cycle`] if `graph` is not
    /// acyclic.
    pub fn new(graph: DependencyGraph, selected: BTreeSet<NodeId>) -> Result<Self> {
        let missing: Vec<NodeId> = selected
            .iter()
            .filter(|id| !graph.contains(id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RundagError::Selection { missing });
        }
        let unselected: Vec<&str> = graph
            .nodes()
            .filter(|id| !selected.contains(*id))
            .map(|id| id.as_str())
            .collect();
        if !unselected.is_empty() {
            return Err(RundagError::Consistency(format!(
                "graph is not reduced to the selection; unselected nodes: {}",
                unselected.join(", ")
            )));
        }

        let levels = LevelScorer::score(&graph)?;

        let mut state = QueueState {
            graph,
            ready: BinaryHeap::new(),
            queued: HashSet::new(),
            in_progress: HashSet::new(),
            next_seq: 0,
            done_count: 0,
        };

        let roots: Vec<NodeId> = state.graph.roots().cloned().collect();
        for root in roots {
            let level = levels.level_of(&root).unwrap_or(0);
            state.enqueue(root, level);
        }

        info!(
            nodes = state.graph.len(),
            ready = state.queued.len(),
            levels = levels.max_level().map_or(0, |l| l + 1),
            "execution queue constructed"
        );

        Ok(Self {
            state: Mutex::new(state),
            ready_cv: Condvar::new(),
            done_cv: Condvar::new(),
            levels,
            selected,
        })
    }

    /// Reduce `graph` to `selected` with [`DependencyGraph::subset`] and build
    /// a queue over the result.
    pub fn from_selection(graph: &DependencyGraph, selected: BTreeSet<NodeId>) -> Result<Self> {
        let reduced = graph.subset(&selected)?;
        Self::new(reduced, selected)
    }

    /// The node ids this run was built for.
    pub fn selected_nodes(&self) -> &BTreeSet<NodeId> {
        &self.selected
    }

    /// Level assigned at construction. Never changes for this queue.
    pub fn level_of(&self, node: &str) -> Option<usize> {
        self.levels.level_of(node)
    }

    pub fn levels(&self) -> &LevelMap {
        &self.levels
    }

    pub fn in_progress_count(&self) -> usize {
        self.lock().in_progress.len()
    }

    /// Ancestors of `node` among the nodes not yet done.
    pub fn ancestors_of(&self, node: &str, max_depth: Option<usize>) -> Result<BTreeSet<NodeId>> {
        self.lock().graph.ancestors(node, max_depth)
    }

    /// Descendants of `node` among the nodes not yet done.
    pub fn descendants_of(&self, node: &str, max_depth: Option<usize>) -> Result<BTreeSet<NodeId>> {
        self.lock().graph.descendants(node, max_depth)
    }

    /// Block until some node is marked done after this call, or until no
    /// node is in progress (so nothing can be marked done). Returns
    /// [`WorkQueue::len`] at wake-up.
    pub fn wait_until_something_was_done(&self) -> usize {
        let mut state = self.lock();
        let seen = state.done_count;
        while state.done_count == seen && !state.in_progress.is_empty() {
            state = self
                .done_cv
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.startable()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkQueue for ExecutionQueue {
    fn get(&self, block: bool, timeout: Option<Duration>) -> Option<NodeId> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();

        loop {
            if let Some(node) = state.pop_ready() {
                return Some(node);
            }
            if !block || state.waiting() == 0 {
                return None;
            }

            state = match deadline {
                None => self
                    .ready_cv
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.ready_cv
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn mark_done(&self, node: &str) -> Result<()> {
        let mut state = self.lock();

        if !state.in_progress.remove(node) {
            return Err(RundagError::Consistency(format!(
                "mark_done({node}) but the node is not in progress"
            )));
        }

        let dependents = state.graph.remove_node(node).map_err(|_| {
            RundagError::Consistency(format!(
                "node {node} was in progress but is missing from the graph"
            ))
        })?;

        for dependent in dependents {
            let unblocked = state.graph.in_degree(&dependent).is_ok_and(|d| d == 0);
            if unblocked && !state.in_progress.contains(&dependent) {
                let level = self.levels.level_of(&dependent).unwrap_or(0);
                state.enqueue(dependent, level);
            }
        }

        state.done_count += 1;
        debug!(
            node = %node,
            remaining = state.startable(),
            in_progress = state.in_progress.len(),
            "node done"
        );

        drop(state);
        self.ready_cv.notify_all();
        self.done_cv.notify_all();
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.lock().startable() == 0
    }

    fn len(&self) -> usize {
        self.lock().startable()
    }

    fn join(&self) {
        let mut state = self.lock();
        while !state.graph.is_empty() {
            state = self
                .done_cv
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
