//! Integration tests for scoped dependency sharing.
//!
//! Exercises the full path an activity takes: policy from configuration,
//! aggregation across the run's workflow graph, unit construction through
//! the scope cache, and eviction once the run is gone.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use heddle::{
    ActivityMeta, DependencyScopes, EngineDirs, InMemoryRunRegistry, ProcessingNode, SharingPolicy,
    WorkflowGraph,
};

fn engine(temp: &TempDir) -> (Arc<InMemoryRunRegistry>, DependencyScopes) {
    let dirs = EngineDirs::from_home_dir(temp.path()).unwrap();
    let registry = Arc::new(InMemoryRunRegistry::new());
    let scopes = DependencyScopes::new(registry.clone(), dirs);
    (registry, scopes)
}

fn activity(policy: SharingPolicy, deps: &[&str]) -> ActivityMeta {
    ActivityMeta::new(deps.iter().copied()).with_policy(policy)
}

#[test]
fn test_activities_of_one_run_share_a_unit() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let first = activity(SharingPolicy::PerWorkflow, &["a.so"]);
    let second = activity(SharingPolicy::PerWorkflow, &["b.so"]);
    let graph = Arc::new(WorkflowGraph::new(vec![
        ProcessingNode::with_activity("first", first.clone()),
        ProcessingNode::with_activity("second", second.clone()),
    ]));
    let run_id = registry.register(graph);

    let unit_a = scopes.unit_for(&run_id, &first).unwrap();
    let unit_b = scopes.unit_for(&run_id, &second).unwrap();

    assert!(Arc::ptr_eq(&unit_a, &unit_b));

    // The shared unit carries the union of both activities' declarations.
    let names: Vec<_> = unit_a
        .locations()
        .iter()
        .map(|l| l.as_path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.so", "b.so"]);
}

#[test]
fn test_runs_do_not_share_units() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let meta = activity(SharingPolicy::PerWorkflow, &["a.so"]);
    let graph = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "only", meta.clone(),
    )]));
    let run_one = registry.register(graph.clone());
    let run_two = registry.register(graph);

    let unit_one = scopes.unit_for(&run_one, &meta).unwrap();
    let unit_two = scopes.unit_for(&run_two, &meta).unwrap();
    assert!(!Arc::ptr_eq(&unit_one, &unit_two));
}

#[test]
fn test_nested_dependencies_join_outer_scope() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let outer = activity(SharingPolicy::PerWorkflow, &["outer.so"]);
    let nested = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "inner",
        activity(SharingPolicy::PerWorkflow, &["inner.so"]),
    )]));
    let graph = Arc::new(WorkflowGraph::new(vec![
        ProcessingNode::with_nested("sub", nested),
        ProcessingNode::with_activity("outer", outer.clone()),
    ]));
    let run_id = registry.register(graph);

    let unit = scopes.unit_for(&run_id, &outer).unwrap();
    let names: Vec<_> = unit
        .locations()
        .iter()
        .map(|l| l.as_path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["inner.so", "outer.so"]);
}

#[test]
fn test_policies_split_into_separate_scopes() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let per_run = activity(SharingPolicy::PerWorkflow, &["run.so"]);
    let process_wide = activity(SharingPolicy::System, &["proc.so"]);
    let graph = Arc::new(WorkflowGraph::new(vec![
        ProcessingNode::with_activity("per-run", per_run.clone()),
        ProcessingNode::with_activity("process-wide", process_wide.clone()),
    ]));
    let run_id = registry.register(graph);

    let run_unit = scopes.unit_for(&run_id, &per_run).unwrap();
    let system_unit = scopes.unit_for(&run_id, &process_wide).unwrap();
    assert!(!Arc::ptr_eq(&run_unit, &system_unit));

    let run_names: Vec<_> = run_unit
        .locations()
        .iter()
        .map(|l| l.as_path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    let system_names: Vec<_> = system_unit
        .locations()
        .iter()
        .map(|l| l.as_path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(run_names, vec!["run.so"]);
    assert_eq!(system_names, vec!["proc.so"]);
}

#[test]
fn test_concurrent_activities_build_once() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let meta = activity(SharingPolicy::PerWorkflow, &["a.so"]);
    let graph = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "only", meta.clone(),
    )]));
    let run_id = registry.register(graph);

    let barrier = Barrier::new(8);
    let units: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    scopes.unit_for(&run_id, &meta).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for unit in &units[1..] {
        assert!(Arc::ptr_eq(&units[0], unit));
    }
}

#[test]
fn test_finished_run_is_rebuilt_not_served_stale() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let meta = activity(SharingPolicy::PerWorkflow, &["a.so"]);
    let graph = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "only", meta.clone(),
    )]));
    let run_id = registry.register(graph);

    let stale = scopes.unit_for(&run_id, &meta).unwrap();
    registry.finish(&run_id);

    // Same id, run gone: the cache must rebuild instead of serving the
    // stale unit. The rebuild takes the activity-local fallback path.
    let fresh = scopes.unit_for(&run_id, &meta).unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));

    let names: Vec<_> = fresh
        .locations()
        .iter()
        .map(|l| l.as_path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.so"]);
}

#[test]
fn test_reap_sweeps_finished_runs() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let meta = activity(SharingPolicy::PerWorkflow, &["a.so"]);
    let graph = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "only", meta.clone(),
    )]));
    let run_id = registry.register(graph);

    scopes.unit_for(&run_id, &meta).unwrap();
    assert_eq!(scopes.reap().unwrap(), 0);

    registry.finish(&run_id);
    assert_eq!(scopes.reap().unwrap(), 1);
    assert_eq!(scopes.reap().unwrap(), 0);
}

#[test]
fn test_scope_unit_resolves_through_baseline() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    // A shared helper placed in the lib dir, declared by the activity.
    let lib_dir = scopes.dirs().lib_dir.clone();
    fs::write(lib_dir.join("helper.bin"), b"x").unwrap();

    let meta = activity(SharingPolicy::PerWorkflow, &["helper.bin"]);
    let graph = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "only", meta.clone(),
    )]));
    let run_id = registry.register(graph);

    let unit = scopes.unit_for(&run_id, &meta).unwrap();
    assert_eq!(
        unit.resolve_resource("helper.bin").unwrap(),
        lib_dir.join("helper.bin")
    );
}

#[test]
fn test_activity_config_round_trip() {
    let temp = TempDir::new().unwrap();
    let (registry, scopes) = engine(&temp);

    let config = serde_json::json!({
        "sharing": "workflow",
        "dependencies": ["conf.so"],
    });
    let meta = ActivityMeta::from_config(&config).unwrap();
    let graph = Arc::new(WorkflowGraph::new(vec![ProcessingNode::with_activity(
        "configured",
        meta.clone(),
    )]));
    let run_id = registry.register(graph);

    let unit = scopes.unit_for(&run_id, &meta).unwrap();
    assert_eq!(unit.locations().len(), 1);
}
