// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Sandboxed workspace access
//!
//! All file operations the agent can perform go through [`Workspace`],
//! which resolves relative paths against a canonical root and rejects
//! any resolution that escapes it.

pub mod patch;
pub mod scan;

pub use patch::{MatchOutcome, PatchApplied};
pub use scan::{LoadedContext, WorkspaceScan};

use std::path::{Component, Path, PathBuf};

use crate::error::WorkspaceError;

/// A sandboxed workspace rooted at a canonical directory.
///
/// The root is resolved once at construction and never changes; starting
/// a session in a different directory means constructing a new value.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace at the given directory.
    ///
    /// The directory must exist; the stored root is fully canonicalized
    /// (symlinks followed, `.`/`..` normalized).
    pub fn open(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::DirectoryNotFound(root.display().to_string())
            } else {
                WorkspaceError::Io(e)
            }
        })?;
        if !canonical.is_dir() {
            return Err(WorkspaceError::DirectoryNotFound(root.display().to_string()));
        }
        Ok(Self { root: canonical })
    }

    /// The canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path against the workspace root.
    ///
    /// `.` and `..` segments are normalized, symlinks are followed for
    /// every existing component, and the result must remain inside the
    /// root. Paths whose final components do not exist yet (write and
    /// create targets) are resolved through their deepest existing
    /// ancestor.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, WorkspaceError> {
        let joined = self.root.join(relative);

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(WorkspaceError::Escape(relative.to_string()));
                    }
                }
                other => normalized.push(other.as_os_str()),
            }
        }

        let resolved = canonicalize_lenient(&normalized)?;
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            tracing::debug!(
                target: "hew::workspace",
                path = %relative,
                resolved = %resolved.display(),
                "rejected path escaping the workspace"
            );
            Err(WorkspaceError::Escape(relative.to_string()))
        }
    }

    /// List the entries of a directory.
    ///
    /// Entries are sorted, hidden entries are skipped, and directories
    /// carry a trailing `/`.
    pub fn list_files(&self, path: &str) -> Result<Vec<String>, WorkspaceError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(WorkspaceError::DirectoryNotFound(path.to_string()));
        }

        let mut names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&resolved)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();

        let mut listing = Vec::with_capacity(names.len());
        for name in names {
            if resolved.join(&name).is_dir() {
                listing.push(format!("{name}/"));
            } else {
                listing.push(name);
            }
        }
        Ok(listing)
    }

    /// Read a file as UTF-8 text.
    pub fn read_file(&self, path: &str) -> Result<String, WorkspaceError> {
        let resolved = self.resolve(path)?;
        let bytes = std::fs::read(&resolved).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::FileNotFound(path.to_string())
            } else {
                WorkspaceError::Io(e)
            }
        })?;
        String::from_utf8(bytes).map_err(|_| WorkspaceError::BinaryContent(path.to_string()))
    }

    /// Write a file, creating missing parent directories.
    pub fn write_file(&self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&resolved, content)?;
        tracing::debug!(
            target: "hew::workspace",
            path = %path,
            bytes = content.len(),
            "wrote file"
        );
        Ok(())
    }

    /// Create a directory and any missing parents.
    pub fn create_directory(&self, path: &str) -> Result<(), WorkspaceError> {
        let resolved = self.resolve(path)?;
        std::fs::create_dir_all(&resolved)?;
        Ok(())
    }

    /// Delete a regular file. Directories are not deletable through this
    /// operation.
    pub fn delete_file(&self, path: &str) -> Result<(), WorkspaceError> {
        let resolved = self.resolve(path)?;
        let metadata = std::fs::metadata(&resolved).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::FileNotFound(path.to_string())
            } else {
                WorkspaceError::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(WorkspaceError::NotAFile(path.to_string()));
        }
        std::fs::remove_file(&resolved)?;
        Ok(())
    }
}

/// Canonicalize a path that may not fully exist yet by canonicalizing its
/// deepest existing ancestor and re-appending the remaining components.
fn canonicalize_lenient(path: &Path) -> Result<PathBuf, WorkspaceError> {
    if let Ok(resolved) = path.canonicalize() {
        return Ok(resolved);
    }

    let mut existing = path.to_path_buf();
    let mut pending: Vec<std::ffi::OsString> = Vec::new();
    while !existing.exists() {
        match existing.file_name() {
            Some(name) => {
                pending.push(name.to_os_string());
                existing.pop();
            }
            None => break,
        }
    }

    let mut resolved = existing.canonicalize().map_err(WorkspaceError::Io)?;
    for name in pending.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
