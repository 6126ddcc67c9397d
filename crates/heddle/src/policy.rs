//! Sharing policies for activity dependencies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How an activity's dependencies are shared with other activities.
///
/// Chosen per activity at configuration time. Activities with the same
/// policy within the same scope see one merged loading unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SharingPolicy {
    /// One loading unit per workflow run, shared by every activity in the
    /// run (including nested sub-workflows) that selects this policy.
    #[default]
    #[serde(rename = "workflow")]
    PerWorkflow,

    /// One process-wide loading unit, built once per process lifetime.
    #[serde(rename = "system")]
    System,
}

impl SharingPolicy {
    /// Parse an optional configuration value.
    ///
    /// An absent or empty value defaults to [`SharingPolicy::PerWorkflow`];
    /// an unrecognized value is a fatal configuration error.
    pub fn from_config(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(Self::default()),
            Some(s) if s.is_empty() => Ok(Self::default()),
            Some(s) => s.parse(),
        }
    }

    /// Configuration string for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerWorkflow => "workflow",
            Self::System => "system",
        }
    }
}

impl FromStr for SharingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "workflow" => Ok(Self::PerWorkflow),
            "system" => Ok(Self::System),
            _ => Err(Error::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for SharingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
