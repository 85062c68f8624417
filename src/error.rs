// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Error types for Hew
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for Hew operations
#[derive(Error, Debug)]
pub enum HewError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Workspace and file operation errors
    #[error("{0}")]
    Workspace(#[from] WorkspaceError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Transport-level API error types.
///
/// These are fatal to the current turn: the orchestration loop stops and
/// reports to the operator rather than retrying on the model's behalf.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// No API key configured for the provider
    #[error("API key for provider '{0}' is not set")]
    MissingKey(String),

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Errors from sandboxed workspace operations.
///
/// Always fatal to the single operation, never to the session: the tool
/// dispatcher converts every variant into a structured failure result.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Path resolves outside the workspace root
    #[error("Security error: path '{0}' resolves outside the workspace")]
    Escape(String),

    /// Missing file on a read/delete
    #[error("File not found: '{0}'")]
    FileNotFound(String),

    /// Missing directory on a list
    #[error("Directory not found: '{0}'")]
    DirectoryNotFound(String),

    /// Delete target is not a regular file
    #[error("Not a regular file: '{0}'")]
    NotAFile(String),

    /// Text read of non-UTF8 content
    #[error("File '{0}' appears to be binary and cannot be read as text")]
    BinaryContent(String),

    /// Patch location could not be uniquely determined
    #[error("{0}")]
    Patch(#[from] PatchError),

    /// Underlying filesystem error
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the text-patch engine.
///
/// Never auto-resolved: surfaced verbatim to the model so it can retry
/// with a more specific search block.
#[derive(Error, Debug)]
pub enum PatchError {
    /// The search block occurs more than once verbatim
    #[error(
        "Ambiguous match: the search block was found {count} times in the file. \
         Provide more surrounding lines to make it unique"
    )]
    ExactAmbiguous { count: usize },

    /// The search block matches more than one line window ignoring whitespace
    #[error(
        "Ambiguous fuzzy match: found {count} occurrences ignoring whitespace. \
         Provide more unique surrounding lines"
    )]
    FuzzyAmbiguous { count: usize },

    /// The search block could not be located at all
    #[error(
        "Match not found: the search block could not be located even with fuzzy \
         matching (ignoring whitespace). Verify the text exists in the file"
    )]
    NoMatch,

    /// The search block is empty
    #[error("Search block is empty")]
    EmptySearch,
}

/// Result type alias for Hew operations
pub type Result<T> = std::result::Result<T, HewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hew_error_config() {
        let err = HewError::Config("bad config".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_hew_error_invalid_input() {
        let err = HewError::InvalidInput("bad input".to_string());
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_hew_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HewError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_api_error_authentication_failed() {
        let err = ApiError::AuthenticationFailed;
        assert!(err.to_string().contains("Authentication failed"));
    }

    #[test]
    fn test_api_error_missing_key() {
        let err = ApiError::MissingKey("google".to_string());
        assert!(err.to_string().contains("google"));
    }

    #[test]
    fn test_api_error_server_error() {
        let err = ApiError::ServerError {
            status: 500,
            message: "internal server error".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("internal server error"));
    }

    #[test]
    fn test_workspace_error_escape() {
        let err = WorkspaceError::Escape("../../etc/passwd".to_string());
        assert!(err.to_string().contains("outside the workspace"));
        assert!(err.to_string().contains("../../etc/passwd"));
    }

    #[test]
    fn test_workspace_error_binary() {
        let err = WorkspaceError::BinaryContent("img.png".to_string());
        assert!(err.to_string().contains("binary"));
    }

    #[test]
    fn test_patch_error_exact_ambiguous() {
        let err = PatchError::ExactAmbiguous { count: 3 };
        assert!(err.to_string().contains("Ambiguous match"));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_patch_error_no_match() {
        let err = PatchError::NoMatch;
        assert!(err.to_string().contains("Match not found"));
    }

    #[test]
    fn test_patch_error_propagates_through_workspace_error() {
        let err: WorkspaceError = PatchError::EmptySearch.into();
        assert_eq!(err.to_string(), "Search block is empty");
    }

    #[test]
    fn test_hew_error_from_api_error() {
        let err: HewError = ApiError::AuthenticationFailed.into();
        assert!(err.to_string().contains("API error"));
    }
}
