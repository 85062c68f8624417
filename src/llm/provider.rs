// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Provider trait and tool-definition types
//!
//! The orchestration loop depends only on this interface; one
//! implementing variant per wire-format family is chosen at session
//! start by the factory.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::{ApiError, Result};
use crate::llm::message::{ChatMessage, ModelTurn};

/// Incremental text deltas from a streaming completion.
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Main trait for LLM providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g. "openai", "google")
    fn name(&self) -> &str;

    /// Non-streaming completion over the full history.
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition])
        -> Result<ModelTurn>;

    /// Streaming completion surfacing text deltas as they arrive.
    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<TextDeltaStream>;

    /// Connection test: a minimal no-tools probe expecting a text reply.
    async fn verify(&self) -> Result<String> {
        let probe = vec![
            ChatMessage::system(
                "You are a helpful assistant. Please respond with only the word 'Success'.",
            ),
            ChatMessage::user("This is a connection test."),
        ];
        match self.complete(&probe, &[]).await? {
            ModelTurn::Text(text) => Ok(text),
            ModelTurn::ToolCalls(_) => Err(ApiError::InvalidResponse(
                "expected a text reply to the connection test".to_string(),
            )
            .into()),
        }
    }
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Input schema (JSON Schema)
    pub input_schema: ToolInputSchema,
}

/// Input schema for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Schema type (always "object")
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions
    pub properties: serde_json::Value,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ToolInputSchema {
    /// The schema as a single JSON value, the shape both wire families
    /// embed under their own framing.
    pub fn as_parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.schema_type,
            "properties": self.properties,
            "required": self.required,
        })
    }
}
