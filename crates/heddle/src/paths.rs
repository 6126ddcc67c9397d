//! Engine directory management.
//!
//! Provides the directory layout under which activity dependencies are
//! resolved, ensuring the same paths are used everywhere a loading unit
//! is built.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory layout for the dependency subsystem.
///
/// All local dependencies live under a `lib` directory inside the engine
/// home, supplied once at process start:
///
/// ```text
/// <home>/
/// └── lib/    # Local dependency files and native libraries
/// ```
#[derive(Debug, Clone)]
pub struct EngineDirs {
    /// The engine home directory.
    pub home_dir: PathBuf,

    /// Directory under which dependency declarations are resolved and
    /// native libraries are looked up.
    pub lib_dir: PathBuf,
}

impl EngineDirs {
    /// Create the directory layout from the engine home directory.
    ///
    /// The home path is made absolute (declaration resolution requires an
    /// absolute base) and the `lib` directory is created if missing.
    ///
    /// # Errors
    /// Returns an error if the path cannot be absolutized or the lib
    /// directory cannot be created.
    pub fn from_home_dir(home: impl AsRef<Path>) -> Result<Self> {
        let home_dir = std::path::absolute(home.as_ref())?;
        let lib_dir = home_dir.join("lib");
        fs::create_dir_all(&lib_dir)?;

        Ok(Self { home_dir, lib_dir })
    }

    /// List the dependency files available under the lib directory.
    ///
    /// Returns the file names (not paths) with the given extension, for
    /// configuration front-ends that offer selectable dependencies.
    /// Subdirectories are not descended into.
    pub fn list_dependencies(&self, ext: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.lib_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == ext) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
