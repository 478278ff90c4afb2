// tests/dependency_graph.rs

use rundag::errors::RundagError;
use rundag::DependencyGraph;
use rundag_test_utils::builders::{graph_from_edges, ids};

#[test]
fn ancestors_and_descendants_follow_edges_transitively() {
    // A -> B -> C -> D, and X -> C
    let g = graph_from_edges(&[], &[("A", "B"), ("B", "C"), ("C", "D"), ("X", "C")]);

    assert_eq!(g.ancestors("D", None).unwrap(), ids(&["A", "B", "C", "X"]));
    assert_eq!(g.descendants("A", None).unwrap(), ids(&["B", "C", "D"]));
    assert!(g.ancestors("A", None).unwrap().is_empty());
    assert!(g.descendants("D", None).unwrap().is_empty());
}

#[test]
fn depth_limit_counts_hops_from_the_start_node() {
    let g = graph_from_edges(&[], &[("A", "B"), ("B", "C"), ("C", "D")]);

    assert_eq!(g.ancestors("D", Some(1)).unwrap(), ids(&["C"]));
    assert_eq!(g.ancestors("D", Some(2)).unwrap(), ids(&["B", "C"]));
    assert_eq!(g.descendants("A", Some(0)).unwrap(), ids(&[]));
    assert_eq!(g.descendants("A", Some(2)).unwrap(), ids(&["B", "C"]));
}

#[test]
fn depth_limit_uses_shortest_path() {
    // A reaches D directly and through B -> C.
    let g = graph_from_edges(&[], &[("A", "B"), ("B", "C"), ("C", "D"), ("A", "D")]);
    assert_eq!(g.ancestors("D", Some(1)).unwrap(), ids(&["A", "C"]));
}

#[test]
fn queries_on_missing_node_fail_with_not_found() {
    let g = graph_from_edges(&["A"], &[]);

    match g.ancestors("nope", None) {
        Err(RundagError::NodeNotFound(id)) => assert_eq!(id.as_str(), "nope"),
        other => panic!("expected NodeNotFound, got {other:?}"),
    }
    assert!(matches!(
        g.descendants("nope", Some(3)),
        Err(RundagError::NodeNotFound(_))
    ));
    assert!(matches!(g.in_degree("nope"), Err(RundagError::NodeNotFound(_))));
}

#[test]
fn subset_rewires_around_excluded_middle_node() {
    // A -> M -> B, select {A, B}
    let g = graph_from_edges(&[], &[("A", "M"), ("M", "B")]);
    let sub = g.subset(&ids(&["A", "B"])).unwrap();

    assert_eq!(sub.len(), 2);
    assert!(!sub.contains("M"));
    assert!(sub.has_edge("A", "B"));
    assert!(!sub.has_edge("A", "A"));
    assert!(!sub.has_edge("B", "B"));
    assert_eq!(sub.edge_count(), 1);
}

#[test]
fn subset_collapses_chains_of_excluded_nodes() {
    // A -> M1 -> M2 -> B, plus A -> M1 -> C
    let g = graph_from_edges(&[], &[("A", "M1"), ("M1", "M2"), ("M2", "B"), ("M1", "C")]);
    let sub = g.subset(&ids(&["A", "B", "C"])).unwrap();

    assert!(sub.has_edge("A", "B"));
    assert!(sub.has_edge("A", "C"));
    assert_eq!(sub.edge_count(), 2);
    assert_eq!(sub.in_degree("A").unwrap(), 0);
}

#[test]
fn subset_drops_isolated_excluded_nodes_without_adding_edges() {
    let g = graph_from_edges(&["lonely"], &[("A", "B")]);
    let sub = g.subset(&ids(&["A", "B"])).unwrap();

    assert_eq!(sub.len(), 2);
    assert_eq!(sub.edge_count(), 1);
}

#[test]
fn subset_does_not_modify_the_source_graph() {
    let g = graph_from_edges(&[], &[("A", "M"), ("M", "B")]);
    let before = g.clone();
    let _ = g.subset(&ids(&["A"])).unwrap();
    assert_eq!(g, before);
}

#[test]
fn subset_with_unknown_ids_is_a_selection_error() {
    let g = graph_from_edges(&[], &[("A", "B")]);

    match g.subset(&ids(&["A", "ghost", "phantom"])) {
        Err(RundagError::Selection { missing }) => {
            let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
            assert_eq!(names, vec!["ghost", "phantom"]);
        }
        other => panic!("expected Selection error, got {other:?}"),
    }
}

#[test]
fn remove_node_detaches_edges_and_reports_dependents() {
    let mut g = graph_from_edges(&[], &[("A", "B"), ("A", "C"), ("B", "C")]);

    let dependents = g.remove_node("A").unwrap();
    assert_eq!(dependents, ids(&["B", "C"]));
    assert_eq!(g.in_degree("B").unwrap(), 0);
    assert_eq!(g.in_degree("C").unwrap(), 1);
    assert_eq!(g.roots().map(|r| r.as_str()).collect::<Vec<_>>(), vec!["B"]);

    assert!(matches!(g.remove_node("A"), Err(RundagError::Consistency(_))));
}

#[test]
fn removing_a_missing_node_is_a_consistency_error() {
    let mut g = DependencyGraph::new();
    g.add_node("A");

    assert!(matches!(g.remove_node("Z"), Err(RundagError::Consistency(_))));
    assert!(g.contains("A"));
    // Lookups keep reporting absent nodes as not found.
    assert!(matches!(g.in_degree("Z"), Err(RundagError::NodeNotFound(_))));
    assert!(matches!(g.descendants("Z", None), Err(RundagError::NodeNotFound(_))));
}
