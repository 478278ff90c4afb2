// tests/execution_queue.rs

use std::thread;
use std::time::{Duration, Instant};

use rundag::errors::RundagError;
use rundag::{ExecutionQueue, WorkQueue};
use rundag_test_utils::builders::{graph_from_edges, ids};
use rundag_test_utils::init_tracing;

fn diamond_queue() -> ExecutionQueue {
    let g = graph_from_edges(&[], &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
    let selected = ids(&["A", "B", "C", "D"]);
    ExecutionQueue::new(g, selected).unwrap()
}

fn drain_single_worker(queue: &ExecutionQueue) -> Vec<String> {
    let mut order = Vec::new();
    while let Some(node) = queue.get(false, None) {
        order.push(node.to_string());
        queue.mark_done(&node).unwrap();
    }
    order
}

#[test]
fn diamond_drains_in_level_order_with_one_worker() {
    init_tracing();
    let queue = diamond_queue();

    let order = drain_single_worker(&queue);

    assert_eq!(order.len(), 4);
    assert_eq!(order[0], "A");
    let mut middle = vec![order[1].clone(), order[2].clone()];
    middle.sort();
    assert_eq!(middle, vec!["B", "C"]);
    assert_eq!(order[3], "D");
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
}

#[test]
fn levels_are_fixed_at_construction() {
    let queue = diamond_queue();
    assert_eq!(queue.level_of("A"), Some(0));
    assert_eq!(queue.level_of("D"), Some(2));

    drain_single_worker(&queue);

    // Done nodes are gone from the graph, but their levels remain.
    assert_eq!(queue.level_of("D"), Some(2));
}

#[test]
fn dependents_are_not_ready_before_dependencies_are_done() {
    let queue = diamond_queue();

    let a = queue.get(false, None).unwrap();
    assert_eq!(a.as_str(), "A");
    assert_eq!(queue.get(false, None), None);

    queue.mark_done(&a).unwrap();
    let first = queue.get(false, None).unwrap();
    let second = queue.get(false, None).unwrap();
    assert_ne!(first, second);
    assert_eq!(queue.get(false, None), None, "D must wait for both B and C");

    queue.mark_done(&first).unwrap();
    assert_eq!(queue.get(false, None), None, "D still waits for the other branch");
    queue.mark_done(&second).unwrap();
    assert_eq!(queue.get(false, None).unwrap().as_str(), "D");
}

#[test]
fn lower_level_wins_over_earlier_discovery() {
    // R1 -> M -> L (levels 0,1,2) and R2 -> X where R2 depends on nothing but
    // X sits on level 1. After R1 and R2 finish, M (level 1) and X (level 1)
    // are ready; after M finishes, L (level 2) must still come after X.
    let g = graph_from_edges(&[], &[("R1", "M"), ("M", "L"), ("R2", "X")]);
    let queue = ExecutionQueue::new(g, ids(&["R1", "M", "L", "R2", "X"])).unwrap();

    let r1 = queue.get(false, None).unwrap();
    let r2 = queue.get(false, None).unwrap();
    assert_eq!((r1.as_str(), r2.as_str()), ("R1", "R2"));
    queue.mark_done(&r1).unwrap();
    let m = queue.get(false, None).unwrap();
    assert_eq!(m.as_str(), "M");
    queue.mark_done(&m).unwrap();
    queue.mark_done(&r2).unwrap();

    // L (level 2) was discovered before X (level 1) but X goes first.
    assert_eq!(queue.get(false, None).unwrap().as_str(), "X");
    assert_eq!(queue.get(false, None).unwrap().as_str(), "L");
}

#[test]
fn double_mark_done_is_a_consistency_error() {
    let queue = diamond_queue();
    let a = queue.get(false, None).unwrap();

    queue.mark_done(&a).unwrap();
    match queue.mark_done(&a) {
        Err(RundagError::Consistency(msg)) => assert!(msg.contains("A")),
        other => panic!("expected Consistency error, got {other:?}"),
    }
}

#[test]
fn mark_done_on_a_node_never_handed_out_is_a_consistency_error() {
    let queue = diamond_queue();
    assert!(matches!(queue.mark_done("A"), Err(RundagError::Consistency(_))));
    assert!(matches!(queue.mark_done("ghost"), Err(RundagError::Consistency(_))));
    // The failed calls left the queue untouched.
    assert_eq!(queue.len(), 4);
}

#[test]
fn len_counts_nodes_not_yet_started() {
    let queue = diamond_queue();
    assert_eq!(queue.len(), 4);

    let a = queue.get(false, None).unwrap();
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.in_progress_count(), 1);

    queue.mark_done(&a).unwrap();
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.in_progress_count(), 0);
}

#[test]
fn emptiness_is_sticky() {
    let g = graph_from_edges(&[], &[("A", "B")]);
    let queue = ExecutionQueue::new(g, ids(&["A", "B"])).unwrap();

    assert!(!queue.is_empty());
    let a = queue.get(false, None).unwrap();
    assert!(!queue.is_empty(), "B is still waiting, so work can be started later");
    queue.mark_done(&a).unwrap();
    let b = queue.get(false, None).unwrap();
    assert!(queue.is_empty());
    queue.mark_done(&b).unwrap();
    assert!(queue.is_empty());
    assert_eq!(queue.get(true, None), None);
    assert!(queue.is_empty());
}

#[test]
fn blocking_get_returns_immediately_when_nothing_can_become_ready() {
    let g = graph_from_edges(&["A"], &[]);
    let queue = ExecutionQueue::new(g, ids(&["A"])).unwrap();
    let _a = queue.get(true, None).unwrap();

    // Only A remains and it is in progress: nothing can ever be queued.
    let started = Instant::now();
    assert_eq!(queue.get(true, None), None);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn blocking_get_with_timeout_gives_up() {
    let g = graph_from_edges(&[], &[("A", "B")]);
    let queue = ExecutionQueue::new(g, ids(&["A", "B"])).unwrap();
    let _a = queue.get(false, None).unwrap();

    let started = Instant::now();
    assert_eq!(queue.get(true, Some(Duration::from_millis(50))), None);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn blocking_get_wakes_up_when_dependency_completes() {
    let g = graph_from_edges(&[], &[("A", "B")]);
    let queue = ExecutionQueue::new(g, ids(&["A", "B"])).unwrap();
    let a = queue.get(false, None).unwrap();

    thread::scope(|s| {
        let waiter = s.spawn(|| queue.get(true, Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(20));
        queue.mark_done(&a).unwrap();
        let got = waiter.join().unwrap();
        assert_eq!(got.map(|n| n.to_string()), Some("B".to_string()));
    });
}

#[test]
fn join_returns_once_every_node_is_done() {
    let queue = diamond_queue();

    thread::scope(|s| {
        s.spawn(|| {
            while let Some(node) = queue.get(true, None) {
                thread::sleep(Duration::from_millis(5));
                queue.mark_done(&node).unwrap();
            }
        });
        queue.join();
    });

    assert_eq!(queue.len(), 0);
    assert_eq!(queue.in_progress_count(), 0);
}

#[test]
fn wait_until_something_was_done_wakes_on_completion() {
    let g = graph_from_edges(&["A", "B"], &[]);
    let queue = ExecutionQueue::new(g, ids(&["A", "B"])).unwrap();
    let a = queue.get(false, None).unwrap();
    let _b = queue.get(false, None).unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(20));
            queue.mark_done(&a).unwrap();
        });
        // B is still in progress, so nothing is left to start.
        assert_eq!(queue.wait_until_something_was_done(), 0);
    });
    assert_eq!(queue.in_progress_count(), 1);
}

#[test]
fn wait_until_something_was_done_does_not_hang_when_idle() {
    let queue = diamond_queue();
    assert_eq!(queue.wait_until_something_was_done(), 4);
}

#[test]
fn selected_nodes_and_locked_graph_reads() {
    let g = graph_from_edges(&[], &[("A", "M"), ("M", "B")]);
    let queue = ExecutionQueue::from_selection(&g, ids(&["A", "B"])).unwrap();

    assert_eq!(queue.selected_nodes(), &ids(&["A", "B"]));
    assert_eq!(queue.descendants_of("A", None).unwrap(), ids(&["B"]));
    assert_eq!(queue.ancestors_of("B", None).unwrap(), ids(&["A"]));
    assert!(matches!(
        queue.ancestors_of("M", None),
        Err(RundagError::NodeNotFound(_))
    ));

    let a = queue.get(false, None).unwrap();
    queue.mark_done(&a).unwrap();
    // Done nodes leave the live graph; the selected set never changes.
    assert!(queue.ancestors_of("B", None).unwrap().is_empty());
    assert_eq!(queue.selected_nodes().len(), 2);
}

#[test]
fn cyclic_graph_fails_before_anything_is_scheduled() {
    let g = graph_from_edges(&[], &[("A", "B"), ("B", "A")]);
    assert!(matches!(
        ExecutionQueue::new(g, ids(&["A", "B"])),
        Err(RundagError::Cycle { .. })
    ));
}

#[test]
fn selecting_unknown_node_fails_before_queue_exists() {
    let g = graph_from_edges(&[], &[("A", "B")]);
    assert!(matches!(
        ExecutionQueue::from_selection(&g, ids(&["A", "nope"])),
        Err(RundagError::Selection { .. })
    ));
}

#[test]
fn unknown_selected_id_is_rejected() {
    let g = graph_from_edges(&["A"], &[]);
    match ExecutionQueue::new(g, ids(&["Z"])) {
        Err(RundagError::Selection { missing }) => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].as_str(), "Z");
        }
        other => panic!("expected Selection error, got {:?}", other.map(|q| q.len())),
    }
}

#[test]
fn graph_with_unselected_nodes_is_rejected() {
    let g = graph_from_edges(&[], &[("A", "B")]);
    assert!(matches!(
        ExecutionQueue::new(g, ids(&["A"])),
        Err(RundagError::Consistency(_))
    ));
}
