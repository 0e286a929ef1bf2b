//! Path and filter utilities

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Store form of a relative path: components joined with '/', on every platform.
pub fn path_to_db_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hidden entries start with '.'.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Lowercase extension with leading '.', or None when the file has no extension.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Canonical absolute root. Missing or non-directory roots are errors.
pub fn canonicalize_root(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        bail!("directory does not exist: {}", path.display());
    }
    if !path.is_dir() {
        bail!("not a directory: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("canonicalize {}", path.display()))
}

/// Root as stored in the database.
pub fn root_to_db_string(root: &Path) -> String {
    root.to_string_lossy().into_owned()
}
