// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Recursive workspace scan for the `/load` command.
//!
//! A simple leaf utility: walks the tree, honors built-in ignore
//! patterns plus `.hewignore`, and separates text files from binaries so
//! the whole workspace can be folded into the next turn's context.

use std::io::Read;
use std::path::Path;

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::WorkspaceError;

use super::Workspace;

/// File-name patterns that are never loaded.
const DEFAULT_FILE_IGNORES: &[&str] = &[
    ".hewignore",
    ".*.swp",
    ".DS_Store",
    "*~",
    ".env",
    "*.o",
    "*.rlib",
];

/// Directory names that are never descended into.
const DEFAULT_DIR_IGNORES: &[&str] = &[
    ".git",
    ".vscode",
    ".idea",
    "node_modules",
    "target",
    "build",
    "dist",
    ".venv",
];

/// Name of the per-workspace ignore file (glob syntax, one pattern per
/// line, trailing `/` marks a directory pattern).
const IGNORE_FILE: &str = ".hewignore";

/// Result of scanning the workspace tree.
#[derive(Debug, Default)]
pub struct WorkspaceScan {
    /// Relative paths of loadable text files, sorted
    pub text_files: Vec<String>,
    /// Relative paths of skipped binary files, sorted
    pub skipped_binaries: Vec<String>,
}

/// Workspace content assembled for context injection.
#[derive(Debug)]
pub struct LoadedContext {
    /// The blob prepended to the next user message
    pub blob: String,
    /// Number of files included
    pub file_count: usize,
    /// Total bytes of included file content
    pub byte_count: usize,
    /// Number of binary files skipped
    pub skipped_binaries: usize,
}

struct IgnoreRules {
    files: Vec<Pattern>,
    dirs: Vec<Pattern>,
}

impl IgnoreRules {
    fn load(workspace: &Workspace) -> Self {
        let mut files: Vec<Pattern> = DEFAULT_FILE_IGNORES
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        let mut dirs: Vec<Pattern> = DEFAULT_DIR_IGNORES
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();

        if let Ok(content) = workspace.read_file(IGNORE_FILE) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let (target, pattern) = if let Some(dir) = line.strip_suffix('/') {
                    (&mut dirs, dir)
                } else {
                    (&mut files, line)
                };
                match Pattern::new(pattern) {
                    Ok(compiled) => target.push(compiled),
                    Err(e) => tracing::warn!(
                        target: "hew::workspace",
                        pattern = %line,
                        error = %e,
                        "skipping invalid ignore pattern"
                    ),
                }
            }
        }

        Self { files, dirs }
    }

    fn ignores_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|p| p.matches(name))
    }

    fn ignores_file(&self, name: &str) -> bool {
        self.files.iter().any(|p| p.matches(name))
    }
}

/// Check for binary content by looking for a NUL byte in the first 1 KiB.
/// Unreadable files are treated as binary.
fn is_binary(path: &Path) -> bool {
    let mut buf = [0u8; 1024];
    match std::fs::File::open(path) {
        Ok(mut file) => match file.read(&mut buf) {
            Ok(n) => buf[..n].contains(&0),
            Err(_) => true,
        },
        Err(_) => true,
    }
}

/// Recursively find all text files in the workspace, respecting ignore
/// patterns.
pub fn scan(workspace: &Workspace) -> Result<WorkspaceScan, WorkspaceError> {
    let rules = IgnoreRules::load(workspace);
    let root = workspace.root();
    let mut result = WorkspaceScan::default();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !rules.ignores_dir(&name)
    });

    for entry in walker {
        let entry = entry.map_err(|e| WorkspaceError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if rules.ignores_file(&name) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        if is_binary(entry.path()) {
            result.skipped_binaries.push(relative);
        } else {
            result.text_files.push(relative);
        }
    }

    result.text_files.sort();
    result.skipped_binaries.sort();
    Ok(result)
}

/// Scan the workspace and assemble the full-content context blob.
///
/// Files that fail to read after the scan are skipped with a warning
/// rather than failing the whole load.
pub fn load_context(workspace: &Workspace) -> Result<LoadedContext, WorkspaceError> {
    let scanned = scan(workspace)?;

    let mut blob = String::from(
        "The user has loaded the entire workspace. Here are the file contents:\n\n",
    );
    let mut file_count = 0;
    let mut byte_count = 0;

    for path in &scanned.text_files {
        match workspace.read_file(path) {
            Ok(content) => {
                byte_count += content.len();
                file_count += 1;
                blob.push_str(&format!(
                    "--- START OF FILE: {path} ---\n{content}\n--- END OF FILE: {path} ---\n\n"
                ));
            }
            Err(e) => tracing::warn!(
                target: "hew::workspace",
                path = %path,
                error = %e,
                "could not read file during load"
            ),
        }
    }

    Ok(LoadedContext {
        blob,
        file_count,
        byte_count,
        skipped_binaries: scanned.skipped_binaries.len(),
    })
}
