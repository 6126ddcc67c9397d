//! Depth-first collection of activities sharing a policy.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::policy::SharingPolicy;

use super::types::{ActivityRef, WorkflowGraph};

/// Collect every activity in `graph` (descending into nested
/// sub-workflows) whose sharing policy equals `policy`.
///
/// This is what lets a nested sub-workflow's local dependencies be pulled
/// into the enclosing run's shared scope. Order is deterministic for a
/// given graph: node order, then activity order, depth-first.
///
/// Nesting is assumed acyclic, but the traversal keeps a visited set of
/// graph identities anyway: a sub-workflow embedded at several points is
/// aggregated once, and a cyclic structure terminates instead of
/// recursing without bound.
pub fn collect_activities(
    graph: &WorkflowGraph,
    policy: SharingPolicy,
) -> Vec<&crate::graph::ActivityMeta> {
    let mut visited: FxHashSet<*const WorkflowGraph> = FxHashSet::default();
    visited.insert(graph as *const WorkflowGraph);

    let mut matches = Vec::new();
    walk(graph, policy, &mut visited, &mut matches);
    matches
}

fn walk<'g>(
    graph: &'g WorkflowGraph,
    policy: SharingPolicy,
    visited: &mut FxHashSet<*const WorkflowGraph>,
    matches: &mut Vec<&'g crate::graph::ActivityMeta>,
) {
    for node in &graph.nodes {
        for activity in &node.activities {
            match activity {
                ActivityRef::Nested(nested) => {
                    if visited.insert(Arc::as_ptr(nested)) {
                        walk(nested, policy, visited, matches);
                    } else {
                        tracing::warn!(
                            node = %node.name,
                            "nested workflow already visited, skipping (shared or cyclic nesting)"
                        );
                    }
                }
                ActivityRef::Activity(meta) => {
                    if meta.policy == policy {
                        matches.push(meta);
                    }
                }
            }
        }
    }
}
