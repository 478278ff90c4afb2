// tests/run_plan.rs

use rundag::errors::RundagError;
use rundag::graph::Selection;
use rundag::manifest::Manifest;
use rundag::plan::RunPlan;
use rundag::WorkQueue;
use rundag_test_utils::builders::{ManifestBuilder, NodeConfigBuilder, graph_from_edges, ids};

/// raw -> inline (ephemeral) -> report, raw -> audit
fn project_with_ephemeral() -> Manifest {
    ManifestBuilder::new()
        .with_node("raw", NodeConfigBuilder::new("echo raw").build())
        .with_node(
            "inline",
            NodeConfigBuilder::new("")
                .depends_on("raw")
                .ephemeral(true)
                .build(),
        )
        .with_node("report", NodeConfigBuilder::new("echo report").depends_on("inline").build())
        .with_node("audit", NodeConfigBuilder::new("echo audit").depends_on("raw").build())
        .build()
}

#[test]
fn ephemeral_nodes_are_cut_and_rewired() {
    let manifest = project_with_ephemeral();
    let plan = RunPlan::build(&manifest, &Selection::all()).unwrap();

    assert!(!plan.graph.contains("inline"));
    assert!(plan.graph.has_edge("raw", "report"));
    assert!(plan.graph.has_edge("raw", "audit"));
    assert_eq!(plan.queue.selected_nodes(), &ids(&["audit", "raw", "report"]));
    assert_eq!(plan.queue.len(), 3);
    assert_eq!(plan.queue.level_of("report"), Some(1));
}

#[test]
fn selection_narrows_the_plan() {
    let manifest = project_with_ephemeral();
    let selection = Selection::parse(&["report"], &[]).unwrap();
    let plan = RunPlan::build(&manifest, &selection).unwrap();

    assert_eq!(plan.graph.len(), 1);
    assert_eq!(plan.queue.get(false, None).unwrap().as_str(), "report");
}

#[test]
fn empty_selection_gives_empty_plan() {
    let manifest = project_with_ephemeral();
    let selection = Selection::parse(&["does.not.exist"], &[]).unwrap();
    let plan = RunPlan::build(&manifest, &selection).unwrap();

    assert!(plan.is_empty());
    assert!(plan.queue.is_empty());
    assert_eq!(plan.queue.get(true, None), None);
}

#[test]
fn describe_lists_levels() {
    let manifest = project_with_ephemeral();
    let plan = RunPlan::build(&manifest, &Selection::all()).unwrap();
    let text = plan.describe();

    assert!(text.contains("3 node(s), 2 level(s), 1 component(s)"));
    assert!(text.contains("level 0: raw"));
    assert!(text.contains("level 1: audit, report"));
}

#[test]
fn unknown_selected_id_is_a_selection_error() {
    let graph = graph_from_edges(&[], &[("a", "b")]);
    match RunPlan::from_graph(&graph, ids(&["a", "zzz"])) {
        Err(RundagError::Selection { missing }) => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].as_str(), "zzz");
        }
        other => panic!("expected Selection error, got {other:?}"),
    }
}
