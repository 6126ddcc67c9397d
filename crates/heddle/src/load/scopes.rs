//! Process-scoped facade handed to activities.
//!
//! One `DependencyScopes` instance is constructed at engine start and
//! injected into every activity that needs scoped dependencies; there is
//! no global lookup. Teardown is dropping the instance.

use std::sync::Arc;

use crate::error::Result;
use crate::graph::ActivityMeta;
use crate::paths::EngineDirs;
use crate::policy::SharingPolicy;
use crate::registry::RunRegistry;

use super::builder::DependencySetBuilder;
use super::cache::{ScopeCache, ScopeKey};
use super::unit::LoadingUnit;

/// Entry point of the dependency subsystem.
///
/// Maps an activity's sharing policy to a scope key and returns that
/// scope's loading unit, building it on first request. All scope units
/// delegate to one baseline unit over the engine's lib directory.
pub struct DependencyScopes {
    registry: Arc<dyn RunRegistry>,
    dirs: EngineDirs,
    base_unit: Arc<LoadingUnit>,
    cache: ScopeCache,
}

impl DependencyScopes {
    /// Create the subsystem state for one process.
    pub fn new(registry: Arc<dyn RunRegistry>, dirs: EngineDirs) -> Self {
        let base_unit = Arc::new(LoadingUnit::root(dirs.lib_dir.clone()));
        let cache = ScopeCache::new(registry.clone());
        Self {
            registry,
            dirs,
            base_unit,
            cache,
        }
    }

    /// Return the loading unit for `activity` executing within run
    /// `run_id`, constructing and caching it if this is the first request
    /// for the scope.
    pub fn unit_for(&self, run_id: &str, activity: &ActivityMeta) -> Result<Arc<LoadingUnit>> {
        let key = match activity.policy {
            SharingPolicy::PerWorkflow => ScopeKey::Workflow(run_id.to_string()),
            SharingPolicy::System => ScopeKey::System,
        };

        self.cache.get_or_create(&key, || {
            let builder = DependencySetBuilder::new(self.registry.as_ref(), &self.dirs.lib_dir);
            let locations = builder.build(run_id, activity.policy, activity);
            Ok(LoadingUnit::new(
                locations,
                Some(self.base_unit.clone()),
                self.dirs.lib_dir.clone(),
            ))
        })
    }

    /// Evict loading units of runs that are no longer alive.
    ///
    /// Returns the number of evicted scopes.
    pub fn reap(&self) -> Result<usize> {
        self.cache.reap()
    }

    /// The baseline unit every scope delegates to.
    pub fn base_unit(&self) -> &Arc<LoadingUnit> {
        &self.base_unit
    }

    /// The directory layout this subsystem resolves against.
    pub fn dirs(&self) -> &EngineDirs {
        &self.dirs
    }
}
