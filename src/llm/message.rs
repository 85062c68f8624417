// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Provider-neutral conversation types
//!
//! The session history is kept in one neutral shape and translated into
//! each provider's wire schema at the boundary. Messages are a tagged
//! union by role so every variant carries exactly the fields that role
//! requires.

use serde::{Deserialize, Serialize};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Pairing id. Id-less wire formats (Gemini) get synthetic
    /// `call_<index>` ids assigned when a response batch is parsed, so
    /// history bookkeeping is uniform across providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool name
    pub name: String,

    /// Arguments as serialized JSON. Kept in wire form because malformed
    /// encodings must be a recoverable error at the point of use, not a
    /// crash during translation.
    pub arguments: String,
}

impl ToolCall {
    /// Create a tool call.
    pub fn new(
        id: Option<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the arguments into a JSON object mapping.
    ///
    /// Fails if the encoding is malformed or does not deserialize to a
    /// mapping; callers surface this as a recoverable tool error.
    pub fn parse_arguments(
        &self,
    ) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }

    /// Parse the arguments, substituting an empty mapping on failure.
    ///
    /// Used on the Gemini wire, where one malformed call must not fail
    /// the translation of the whole history.
    pub fn arguments_or_empty(&self) -> serde_json::Value {
        match serde_json::from_str::<serde_json::Value>(&self.arguments) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            _ => serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A message in the conversation history, discriminated by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    /// The fixed system prompt
    System { content: String },

    /// Operator input (possibly with injected workspace context)
    User { content: String },

    /// Model output: either text or an ordered tool-call batch
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },

    /// The structured result answering one tool call
    Tool {
        /// Name of the tool that produced this result
        name: String,
        /// JSON-serialized result payload
        content: String,
        /// Pairing id for id-bearing providers; id-less providers pair
        /// by adjacency
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
    },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    /// Create a plain-text assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying a tool-call batch.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        ChatMessage::Assistant {
            content: None,
            tool_calls,
        }
    }

    /// Create a tool-result message.
    pub fn tool_result(
        name: impl Into<String>,
        content: impl Into<String>,
        call_id: Option<String>,
    ) -> Self {
        ChatMessage::Tool {
            name: name.into(),
            content: content.into(),
            call_id,
        }
    }

    /// The role of this message.
    pub fn role(&self) -> Role {
        match self {
            ChatMessage::System { .. } => Role::System,
            ChatMessage::User { .. } => Role::User,
            ChatMessage::Assistant { .. } => Role::Assistant,
            ChatMessage::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if this message carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ChatMessage::System { content }
            | ChatMessage::User { content }
            | ChatMessage::Tool { content, .. } => Some(content),
            ChatMessage::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Whether this is a tool-result message.
    pub fn is_tool_result(&self) -> bool {
        matches!(self, ChatMessage::Tool { .. })
    }
}

/// One parsed model response: plain text ends the turn, tool calls keep
/// the loop running.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// Plain text reply
    Text(String),
    /// Ordered tool-call batch
    ToolCalls(Vec<ToolCall>),
}
