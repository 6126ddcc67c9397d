//! Chain-of-responsibility loading unit.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;
use std::sync::Arc;

use libloading::Library;

use crate::error::{Error, Result};
use crate::location::ResolvedLocation;

/// Map a library name to its platform-specific file name
/// (`foo` → `libfoo.so` / `libfoo.dylib` / `foo.dll`).
pub(crate) fn platform_library_filename(name: &str) -> String {
    format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
}

/// An isolated code-loading unit for one scope.
///
/// Resolution is own-locations-first: a request is matched against the
/// ordered location list, and only on a miss delegated to the parent
/// unit. Native-library requests check a fixed local directory before
/// delegating, so workflow-local native binaries shadow ones already
/// visible to the parent.
///
/// The parent is shared, never owned; it is borrowed for lookup only.
#[derive(Debug)]
pub struct LoadingUnit {
    /// Search list, in discovery order.
    locations: Vec<ResolvedLocation>,
    /// Next unit in the delegation chain.
    parent: Option<Arc<LoadingUnit>>,
    /// Local directory searched first for native libraries.
    native_dir: PathBuf,
}

impl LoadingUnit {
    /// Create a unit over `locations`, delegating misses to `parent`.
    pub fn new(
        locations: Vec<ResolvedLocation>,
        parent: Option<Arc<LoadingUnit>>,
        native_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            locations,
            parent,
            native_dir: native_dir.into(),
        }
    }

    /// Create a parentless baseline unit with an empty location list.
    ///
    /// Sits at the top of every delegation chain.
    pub fn root(native_dir: impl Into<PathBuf>) -> Self {
        Self::new(Vec::new(), None, native_dir)
    }

    /// The unit's own search list.
    pub fn locations(&self) -> &[ResolvedLocation] {
        &self.locations
    }

    /// The parent unit, if any.
    pub fn parent(&self) -> Option<&Arc<LoadingUnit>> {
        self.parent.as_ref()
    }

    /// Resolve a code artifact by library name.
    ///
    /// The name is mapped to its platform file name, then matched against
    /// the location list in search order: a file location matches by file
    /// name, a directory location by containing the file. On a miss the
    /// request is delegated to the parent.
    pub fn resolve_code(&self, name: &str) -> Option<PathBuf> {
        self.resolve_file(&platform_library_filename(name))
    }

    /// Resolve an arbitrary resource by file name, own locations first,
    /// then the parent.
    pub fn resolve_resource(&self, name: &str) -> Option<PathBuf> {
        self.resolve_file(name)
    }

    fn resolve_file(&self, file_name: &str) -> Option<PathBuf> {
        for location in &self.locations {
            let path = location.as_path();
            if path.is_file() {
                if path.file_name().is_some_and(|n| n == std::ffi::OsStr::new(file_name)) {
                    return Some(path.to_path_buf());
                }
            } else if path.is_dir() {
                let candidate = path.join(file_name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.resolve_file(file_name))
    }

    /// Resolve a native library by name.
    ///
    /// Checks the local native directory first; only on a miss is the
    /// request delegated to the parent's native resolution. This order is
    /// load-bearing: it lets a scope's local native binaries shadow ones
    /// the parent could also provide.
    pub fn resolve_native_library(&self, name: &str) -> Option<PathBuf> {
        let candidate = self.native_dir.join(platform_library_filename(name));
        if candidate.is_file() {
            tracing::debug!(name, path = %candidate.display(), "found native library locally");
            return Some(candidate);
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.resolve_native_library(name))
    }

    /// Resolve and open a code artifact as a dynamic library.
    pub fn load_code(&self, name: &str) -> Result<Library> {
        let path = self
            .resolve_code(name)
            .ok_or_else(|| Error::CodeNotFound(name.to_string()))?;
        // Safety: loading a library runs its initializers; the artifact
        // comes from the configured dependency directories.
        unsafe { Library::new(&path) }.map_err(Error::from)
    }

    /// Resolve and open a native library.
    pub fn load_native_library(&self, name: &str) -> Result<Library> {
        let path = self
            .resolve_native_library(name)
            .ok_or_else(|| Error::NativeLibraryNotFound(name.to_string()))?;
        // Safety: as for load_code.
        unsafe { Library::new(&path) }.map_err(Error::from)
    }
}
