//! Resolution of dependency declarations into canonical locations.
//!
//! A declaration is a name relative to the engine's lib directory.
//! Resolution is a pure function: it normalizes the combined path
//! lexically, without touching the filesystem, so that duplicate
//! declarations across activities collapse to one location.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Canonical absolute location of a resolved dependency.
///
/// Equality and hashing are exact path equality; no normalization happens
/// beyond what [`resolve`] performed. Two declarations that canonicalize
/// to the same path are the same location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedLocation(PathBuf);

impl ResolvedLocation {
    /// The canonical absolute path of this location.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consume the location, returning its path.
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ResolvedLocation {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolve a dependency declaration against a base directory.
///
/// Returns the canonical absolute path `base_dir/declaration` after
/// lexical normalization. Fails (without aborting the caller) when the
/// declaration cannot name a file under the base directory: empty names,
/// NUL bytes, absolute paths, or `..` sequences that escape the base.
pub fn resolve(declaration: &str, base_dir: &Path) -> Result<ResolvedLocation> {
    let fail = |reason: &str| Error::Resolution {
        declaration: declaration.to_string(),
        reason: reason.to_string(),
    };

    if declaration.is_empty() {
        return Err(fail("empty declaration"));
    }
    if declaration.contains('\0') {
        return Err(fail("declaration contains a NUL byte"));
    }
    if !base_dir.is_absolute() {
        return Err(fail("base directory is not absolute"));
    }

    let relative = Path::new(declaration);
    if relative.is_absolute() {
        return Err(fail("declaration must be relative to the base directory"));
    }

    // Lexical normalization: drop `.`, fold `..`, reject escapes.
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(p) => parts.push(p),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(fail("declaration escapes the base directory"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(fail("declaration must be relative to the base directory"));
            }
        }
    }
    if parts.is_empty() {
        return Err(fail("declaration is empty after normalization"));
    }

    let mut path = base_dir.to_path_buf();
    for part in parts {
        path.push(part);
    }
    Ok(ResolvedLocation(path))
}
