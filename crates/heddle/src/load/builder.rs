//! Aggregation of resolved dependency locations for a scope.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::graph::{ActivityMeta, collect_activities};
use crate::location::{self, ResolvedLocation};
use crate::policy::SharingPolicy;
use crate::registry::RunRegistry;

/// Builds the de-duplicated union of resolvable dependency locations for
/// a scope.
///
/// Declarations that fail to resolve are logged and skipped; a run that
/// cannot be found in the registry degrades to resolving only the
/// requesting activity's own declarations.
pub struct DependencySetBuilder<'a> {
    registry: &'a dyn RunRegistry,
    base_dir: &'a Path,
}

impl<'a> DependencySetBuilder<'a> {
    /// Create a builder resolving declarations under `base_dir`.
    pub fn new(registry: &'a dyn RunRegistry, base_dir: &'a Path) -> Self {
        Self { registry, base_dir }
    }

    /// Build the location set for `policy` within the run `run_id`.
    ///
    /// `self_activity` is the requesting activity; it is the sole
    /// contributor when the run cannot be located (isolated or test
    /// invocation). The result is de-duplicated and in discovery order,
    /// stable within this call.
    pub fn build(
        &self,
        run_id: &str,
        policy: SharingPolicy,
        self_activity: &ActivityMeta,
    ) -> Vec<ResolvedLocation> {
        match self.registry.lookup_graph(run_id) {
            Some(graph) => {
                let activities = collect_activities(&graph, policy);
                tracing::debug!(
                    run_id,
                    %policy,
                    activities = activities.len(),
                    "aggregating dependencies across workflow"
                );
                self.resolve_all(activities.iter().flat_map(|meta| meta.declarations.iter()))
            }
            None => {
                tracing::debug!(
                    run_id,
                    "run not found in registry, resolving activity-local dependencies only"
                );
                self.resolve_all(self_activity.declarations.iter())
            }
        }
    }

    fn resolve_all<'d>(
        &self,
        declarations: impl Iterator<Item = &'d String>,
    ) -> Vec<ResolvedLocation> {
        let mut seen: FxHashSet<ResolvedLocation> = FxHashSet::default();
        let mut locations = Vec::new();

        for declaration in declarations {
            match location::resolve(declaration, self.base_dir) {
                Ok(resolved) => {
                    if seen.insert(resolved.clone()) {
                        locations.push(resolved);
                    }
                }
                Err(err) => {
                    tracing::warn!(declaration = %declaration, error = %err, "skipping unresolvable dependency");
                }
            }
        }

        locations
    }
}
