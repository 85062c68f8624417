// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Wire-format provider implementations
//!
//! Two families are supported: the OpenAI-compatible flat message array
//! (one implementation serving openai, openrouter, groq, and lmstudio
//! through their own endpoints) and the Gemini nested-contents schema.

pub mod google;
pub mod openai;

pub use google::GoogleProvider;
pub use openai::OpenAiCompatProvider;

use async_stream::try_stream;
use futures::Stream;
use futures_util::StreamExt;

use crate::error::{ApiError, HewError, Result};

/// Split an SSE response body into the payloads of its `data:` lines.
///
/// Both wire families frame their streaming variants this way; each
/// provider parses the payloads into its own chunk type.
pub(crate) fn sse_data_lines(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut buffer = String::new();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk =
                chunk.map_err(|e| HewError::Api(ApiError::StreamError(e.to_string())))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.replace_range(..=newline, "");
                if let Some(data) = line.strip_prefix("data:") {
                    yield data.trim().to_string();
                }
            }
        }
    }
}

/// Map a non-success HTTP status and body into an [`ApiError`].
pub(crate) fn response_error(status: u16, body: &str) -> HewError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum ErrorDetail {
        Message { message: String },
        Plain(String),
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| match b.error {
            ErrorDetail::Message { message } => message,
            ErrorDetail::Plain(message) => message,
        })
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 | 403 => HewError::Api(ApiError::AuthenticationFailed),
        429 => HewError::Api(ApiError::RateLimited(60)),
        _ => HewError::Api(ApiError::ServerError { status, message }),
    }
}
