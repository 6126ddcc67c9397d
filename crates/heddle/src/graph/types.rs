//! Types for the workflow graph shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::policy::SharingPolicy;

/// Dependency metadata configured on an ordinary activity.
///
/// The subsystem treats this as opaque configuration data: the policy is
/// validated against the enum, the declarations are not interpreted
/// beyond resolution against the lib directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMeta {
    /// How this activity's dependencies are shared.
    #[serde(default)]
    pub policy: SharingPolicy,

    /// Names of local dependency files, relative to the lib directory.
    /// Unordered; duplicates across activities collapse during resolution.
    #[serde(default)]
    pub declarations: Vec<String>,
}

impl ActivityMeta {
    /// Create metadata with the default sharing policy.
    pub fn new(declarations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            policy: SharingPolicy::default(),
            declarations: declarations.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the sharing policy.
    pub fn with_policy(mut self, policy: SharingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parse activity metadata from its JSON configuration fragment.
    ///
    /// Recognized fields:
    /// - `"sharing"`: optional policy string; absent defaults to
    ///   `workflow`, unrecognized values are a fatal configuration error.
    /// - `"dependencies"`: optional array of declaration strings.
    pub fn from_config(config: &serde_json::Value) -> Result<Self> {
        let policy = match config.get("sharing") {
            None | Some(serde_json::Value::Null) => SharingPolicy::default(),
            Some(value) => {
                let s = value.as_str().ok_or_else(|| {
                    Error::InvalidConfig(format!("'sharing' must be a string, got {value}"))
                })?;
                SharingPolicy::from_config(Some(s))?
            }
        };

        let declarations = match config.get("dependencies") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => {
                let mut declarations = Vec::with_capacity(items.len());
                for item in items {
                    let s = item.as_str().ok_or_else(|| {
                        Error::InvalidConfig(format!(
                            "'dependencies' entries must be strings, got {item}"
                        ))
                    })?;
                    declarations.push(s.to_string());
                }
                declarations
            }
            Some(other) => {
                return Err(Error::InvalidConfig(format!(
                    "'dependencies' must be an array, got {other}"
                )));
            }
        };

        Ok(Self {
            policy,
            declarations,
        })
    }
}

/// An activity carried by a processing node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActivityRef {
    /// An ordinary activity with its own sharing policy and declarations.
    Activity(ActivityMeta),

    /// A nested sub-workflow embedded as a single node's activity.
    ///
    /// Shared, not owned: the same sub-workflow may be embedded at more
    /// than one point of the enclosing structure.
    Nested(Arc<WorkflowGraph>),
}

/// A single processing step in a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingNode {
    /// Node name, for diagnostics only.
    pub name: String,

    /// Zero or more activities bound to this node.
    pub activities: Vec<ActivityRef>,
}

impl ProcessingNode {
    /// Create a node carrying a single ordinary activity.
    pub fn with_activity(name: impl Into<String>, meta: ActivityMeta) -> Self {
        Self {
            name: name.into(),
            activities: vec![ActivityRef::Activity(meta)],
        }
    }

    /// Create a node carrying a nested sub-workflow.
    pub fn with_nested(name: impl Into<String>, nested: Arc<WorkflowGraph>) -> Self {
        Self {
            name: name.into(),
            activities: vec![ActivityRef::Nested(nested)],
        }
    }
}

/// A rooted workflow structure, read-only to this subsystem.
///
/// Edges between nodes are irrelevant to dependency aggregation and are
/// not represented here; only the node set and the nesting structure
/// matter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// Processing nodes, in definition order.
    pub nodes: Vec<ProcessingNode>,
}

impl WorkflowGraph {
    /// Create a graph from its nodes.
    pub fn new(nodes: Vec<ProcessingNode>) -> Self {
        Self { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_full() {
        let config = serde_json::json!({
            "sharing": "system",
            "dependencies": ["a.so", "b.so"],
        });
        let meta = ActivityMeta::from_config(&config).unwrap();
        assert_eq!(meta.policy, SharingPolicy::System);
        assert_eq!(meta.declarations, vec!["a.so", "b.so"]);
    }

    #[test]
    fn test_from_config_defaults() {
        let meta = ActivityMeta::from_config(&serde_json::json!({})).unwrap();
        assert_eq!(meta.policy, SharingPolicy::PerWorkflow);
        assert!(meta.declarations.is_empty());
    }

    #[test]
    fn test_from_config_unknown_policy() {
        let config = serde_json::json!({ "sharing": "nebula" });
        let err = ActivityMeta::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::UnknownPolicy(_)));
    }

    #[test]
    fn test_from_config_malformed_dependencies() {
        let config = serde_json::json!({ "dependencies": "a.so" });
        assert!(matches!(
            ActivityMeta::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));

        let config = serde_json::json!({ "dependencies": [1, 2] });
        assert!(matches!(
            ActivityMeta::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
