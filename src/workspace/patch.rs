// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Text-patch engine
//!
//! Locates a target region in a file via exact or whitespace-fuzzy
//! matching and replaces it. Two phases:
//!
//! 1. **Exact**: count non-overlapping literal occurrences of the search
//!    block. One occurrence is replaced; more than one fails as
//!    ambiguous without ever falling through to fuzzy matching.
//! 2. **Fuzzy**: compare line windows after stripping leading/trailing
//!    whitespace from every line. A unique window is replaced, with the
//!    matched line's indentation applied uniformly to an unindented
//!    replacement.
//!
//! Ambiguity is always refused, never guessed away. There is no diff
//! algorithm here; the model is expected to supply a verbatim or
//! near-verbatim excerpt.

use crate::error::{PatchError, WorkspaceError};

use super::Workspace;

/// Where a search block was (or was not) located in file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Exactly one literal occurrence
    ExactUnique,
    /// More than one literal occurrence
    ExactAmbiguous { count: usize },
    /// Exactly one whitespace-insensitive line window, starting at `line`
    FuzzyUnique { line: usize },
    /// More than one whitespace-insensitive line window
    FuzzyAmbiguous { count: usize },
    /// No occurrence at either phase
    NoMatch,
    /// The search block has no lines (fuzzy phase only; an empty block
    /// never reaches here because the exact phase counts it at every
    /// position)
    EmptySearch,
}

/// Which phase produced a successful edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchApplied {
    Exact,
    Fuzzy,
}

impl PatchApplied {
    /// The user-facing success message for this phase.
    pub fn message(&self) -> &'static str {
        match self {
            PatchApplied::Exact => "Edit applied successfully using exact match",
            PatchApplied::Fuzzy => {
                "Edit applied successfully using fuzzy match (indentation corrected)"
            }
        }
    }
}

/// Locate `search` within `content` without modifying anything.
pub fn locate(content: &str, search: &str) -> MatchOutcome {
    let exact = content.matches(search).count();
    if exact == 1 {
        return MatchOutcome::ExactUnique;
    }
    if exact > 1 {
        return MatchOutcome::ExactAmbiguous { count: exact };
    }

    let search_lines: Vec<&str> = search.lines().map(str::trim).collect();
    if search_lines.is_empty() {
        return MatchOutcome::EmptySearch;
    }

    let file_lines: Vec<&str> = content.lines().map(str::trim).collect();
    let window = search_lines.len();
    if file_lines.len() < window {
        return MatchOutcome::NoMatch;
    }

    let hits: Vec<usize> = (0..=file_lines.len() - window)
        .filter(|&i| file_lines[i..i + window] == search_lines[..])
        .collect();

    match hits.len() {
        0 => MatchOutcome::NoMatch,
        1 => MatchOutcome::FuzzyUnique { line: hits[0] },
        count => MatchOutcome::FuzzyAmbiguous { count },
    }
}

/// Apply `search` → `replace` to `content`, returning the new content and
/// the phase that matched.
pub fn apply(
    content: &str,
    search: &str,
    replace: &str,
) -> Result<(String, PatchApplied), PatchError> {
    match locate(content, search) {
        MatchOutcome::ExactUnique => {
            Ok((content.replacen(search, replace, 1), PatchApplied::Exact))
        }
        MatchOutcome::ExactAmbiguous { count } => Err(PatchError::ExactAmbiguous { count }),
        MatchOutcome::FuzzyUnique { line } => {
            Ok((apply_fuzzy(content, search, replace, line), PatchApplied::Fuzzy))
        }
        MatchOutcome::FuzzyAmbiguous { count } => Err(PatchError::FuzzyAmbiguous { count }),
        MatchOutcome::NoMatch => Err(PatchError::NoMatch),
        MatchOutcome::EmptySearch => Err(PatchError::EmptySearch),
    }
}

/// Rebuild `content` with the fuzzy-matched window replaced.
///
/// If the replacement's first line carries no leading whitespace while
/// the matched line does, the matched line's exact whitespace prefix is
/// prepended to every replacement line: one global indent, not a
/// per-line re-derivation.
fn apply_fuzzy(content: &str, search: &str, replace: &str, start: usize) -> String {
    let file_lines: Vec<&str> = content.lines().collect();
    let window = search.lines().count();
    let end = start + window;

    let matched_line = file_lines[start];
    let indent = &matched_line[..matched_line.len() - matched_line.trim_start().len()];

    let replace_lines: Vec<&str> = replace.lines().collect();
    let needs_indent = !replace_lines.is_empty()
        && !indent.is_empty()
        && !replace_lines[0].starts_with(' ')
        && !replace_lines[0].starts_with('\t');
    let replacement = if needs_indent {
        replace_lines
            .iter()
            .map(|line| format!("{indent}{line}"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        replace.to_string()
    };

    let pre = file_lines[..start].join("\n");
    let post = file_lines[end..].join("\n");

    let mut result = String::new();
    if !pre.is_empty() {
        result.push_str(&pre);
        result.push('\n');
    }
    result.push_str(&replacement);
    if !post.is_empty() {
        if !replacement.is_empty() && !replacement.ends_with('\n') {
            result.push('\n');
        }
        result.push_str(&post);
    }
    result
}

impl Workspace {
    /// Apply a search/replace edit to a file inside the workspace.
    pub fn apply_edit(
        &self,
        path: &str,
        search_block: &str,
        replace_block: &str,
    ) -> Result<PatchApplied, WorkspaceError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(WorkspaceError::FileNotFound(path.to_string()));
        }

        let bytes = std::fs::read(&resolved)?;
        let original = String::from_utf8(bytes)
            .map_err(|_| WorkspaceError::BinaryContent(path.to_string()))?;

        let (updated, applied) = apply(&original, search_block, replace_block)?;
        std::fs::write(&resolved, updated)?;

        tracing::debug!(
            target: "hew::workspace",
            path = %path,
            phase = ?applied,
            "applied edit"
        );
        Ok(applied)
    }
}
