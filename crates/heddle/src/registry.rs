//! Run registry collaborator.
//!
//! The dependency subsystem only consumes a read accessor over live
//! workflow runs; run lifecycle is managed elsewhere. The registry also
//! doubles as the explicit liveness signal driving cache eviction: a run
//! is alive exactly as long as the registry still knows it.

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::graph::WorkflowGraph;

/// Read access to the workflow graphs of live runs.
pub trait RunRegistry: Send + Sync {
    /// Look up the workflow graph of a run, or `None` if the run is
    /// unknown or already gone.
    fn lookup_graph(&self, run_id: &str) -> Option<Arc<WorkflowGraph>>;

    /// Whether the run is still alive.
    ///
    /// The scope cache uses this to decide when a workflow-scoped
    /// loading unit may be evicted; the cache itself never holds the
    /// graph, so it cannot keep a run alive.
    fn is_alive(&self, run_id: &str) -> bool {
        self.lookup_graph(run_id).is_some()
    }
}

/// In-process run registry.
pub struct InMemoryRunRegistry {
    runs: RwLock<FxHashMap<String, Arc<WorkflowGraph>>>,
}

impl InMemoryRunRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a new run for `graph`, returning its fresh run id.
    pub fn register(&self, graph: Arc<WorkflowGraph>) -> String {
        let run_id = Uuid::new_v4().to_string();
        self.insert(run_id.clone(), graph);
        run_id
    }

    /// Register a run under a caller-chosen id, replacing any previous
    /// graph for that id.
    pub fn insert(&self, run_id: String, graph: Arc<WorkflowGraph>) {
        self.runs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(run_id, graph);
    }

    /// Remove a finished run. Returns true if the run was known.
    pub fn finish(&self, run_id: &str) -> bool {
        self.runs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(run_id)
            .is_some()
    }

    /// Number of live runs.
    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no runs are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry for InMemoryRunRegistry {
    fn lookup_graph(&self, run_id: &str) -> Option<Arc<WorkflowGraph>> {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(run_id)
            .cloned()
    }
}
