//! Read-only workflow graph shape and the dependency-collecting walk.
//!
//! This module defines only what the dependency subsystem needs from a
//! workflow: a rooted structure of processing nodes carrying activity
//! metadata, nestable to arbitrary depth, plus a traversal that gathers
//! every activity sharing a given policy across the nesting.

mod types;
mod walk;

pub use types::{ActivityMeta, ActivityRef, ProcessingNode, WorkflowGraph};
pub use walk::collect_activities;
