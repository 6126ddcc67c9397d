//! Error types for heddle.

use thiserror::Error;

/// Result type for heddle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving and loading activity dependencies.
#[derive(Debug, Error)]
pub enum Error {
    /// Unrecognized sharing-policy value in an activity configuration.
    ///
    /// Fatal to the requesting call: without a policy the activity's
    /// scope cannot be determined at all.
    #[error("unknown sharing policy: '{0}'")]
    UnknownPolicy(String),

    /// Malformed activity configuration fragment.
    #[error("invalid activity configuration: {0}")]
    InvalidConfig(String),

    /// A dependency declaration could not be turned into a usable location.
    ///
    /// Soft at the aggregation level: the builder logs and skips the
    /// declaration instead of failing the whole scope.
    #[error("cannot resolve dependency '{declaration}': {reason}")]
    Resolution { declaration: String, reason: String },

    /// Building a scope's loading unit failed.
    ///
    /// Delivered to every caller parked on the scope key; the key is
    /// reset so a later call may retry.
    #[error("failed to build loading unit for scope {key}: {message}")]
    ScopeBuild { key: String, message: String },

    /// No location in the unit chain provides the requested code artifact.
    #[error("code artifact not found: {0}")]
    CodeNotFound(String),

    /// No location in the unit chain provides the requested native library.
    #[error("native library not found: {0}")]
    NativeLibraryNotFound(String),

    /// Failed to open a resolved artifact as a dynamic library.
    #[error("failed to load library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding shared scope state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    Lock(String),
}
