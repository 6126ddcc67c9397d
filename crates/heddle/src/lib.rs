//! Scoped dependency resolution and loading for workflow activities.
//!
//! This crate provides:
//! - Resolution of per-activity dependency declarations into canonical
//!   locations under the engine's lib directory
//! - Recursive aggregation of dependencies across nested sub-workflows
//! - Chain-of-responsibility loading units with local-first native
//!   library resolution
//! - An at-most-once scope cache with liveness-driven eviction
//!
//! Activities that declare local dependencies may share one loading unit
//! per workflow run or one per process, chosen by their
//! [`SharingPolicy`]. The [`DependencyScopes`] facade is constructed once
//! at engine start and injected into activities; asking it for a unit
//! either returns the cached one or builds it exactly once, no matter
//! how many activities ask concurrently.

pub mod error;
pub mod graph;
pub mod load;
pub mod location;
pub mod paths;
pub mod policy;
pub mod registry;

pub use error::{Error, Result};
pub use graph::{ActivityMeta, ActivityRef, ProcessingNode, WorkflowGraph, collect_activities};
pub use load::{DependencyScopes, DependencySetBuilder, LoadingUnit, ScopeCache, ScopeKey};
pub use location::ResolvedLocation;
pub use paths::EngineDirs;
pub use policy::SharingPolicy;
pub use registry::{InMemoryRunRegistry, RunRegistry};
