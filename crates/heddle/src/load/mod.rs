//! Loading units and the scope machinery that shares them.
//!
//! # Architecture
//!
//! ```text
//! activity thread
//!     │
//!     └── DependencyScopes::unit_for(run_id, activity)
//!             │
//!             └── ScopeCache::get_or_create(key)      ── at most one build per key
//!                     │
//!                     └── DependencySetBuilder::build ── walks the run's graph,
//!                             │                          resolves declarations
//!                             └── LoadingUnit          ── own locations first,
//!                                                        then parent delegation
//! ```
//!
//! # Module Structure
//!
//! - `builder` - aggregation of resolved locations for a scope
//! - `unit` - chain-of-responsibility loading unit
//! - `cache` - at-most-once scope cache with liveness-driven eviction
//! - `scopes` - injected process-scoped facade tying the above together

mod builder;
mod cache;
mod scopes;
mod unit;

pub use builder::DependencySetBuilder;
pub use cache::{ScopeCache, ScopeKey};
pub use scopes::DependencyScopes;
pub use unit::LoadingUnit;
