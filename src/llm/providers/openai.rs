// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! OpenAI-compatible provider (wire family A)
//!
//! One implementation serves every endpoint that speaks the flat
//! chat-completions schema: OpenAI, OpenRouter, Groq, and LM Studio.
//! The neutral history maps 1:1 onto this wire: assistant tool calls
//! are carried as-is, tool results answer by `tool_call_id`.

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::llm::message::{ChatMessage, ModelTurn, ToolCall};
use crate::llm::provider::{ModelProvider, TextDeltaStream, ToolDefinition};

use super::{response_error, sse_data_lines};

/// Provider for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiCompatProvider {
    client: Client,
    name: String,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiCompatProvider {
    /// Create a provider for a named OpenAI-compatible endpoint.
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
        }
    }

    fn ensure_key(&self) -> Result<()> {
        if self.api_key.is_empty() || self.api_key.contains("YOUR_") {
            return Err(ApiError::MissingKey(self.name.clone()).into());
        }
        Ok(())
    }

    /// Convert neutral history into the wire message array.
    fn convert_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|message| match message {
                ChatMessage::System { content } => WireMessage {
                    role: "system",
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                    name: None,
                },
                ChatMessage::User { content } => WireMessage {
                    role: "user",
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                    name: None,
                },
                ChatMessage::Assistant {
                    content,
                    tool_calls,
                } => WireMessage {
                    role: "assistant",
                    content: content.clone(),
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            tool_calls
                                .iter()
                                .enumerate()
                                .map(|(index, call)| WireToolCall {
                                    id: call
                                        .id
                                        .clone()
                                        .unwrap_or_else(|| format!("call_{index}")),
                                    call_type: "function".to_string(),
                                    function: WireFunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.arguments.clone(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: None,
                    name: None,
                },
                ChatMessage::Tool {
                    name,
                    content,
                    call_id,
                } => WireMessage {
                    role: "tool",
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: call_id.clone(),
                    name: Some(name.clone()),
                },
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|tool| WireTool {
                tool_type: "function".to_string(),
                function: WireFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.as_parameters(),
                },
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> WireRequest {
        WireRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(messages),
            stream,
            tools: if tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(tools))
            },
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Result<reqwest::Response> {
        self.ensure_key()?;
        let body = self.build_request(messages, tools, stream);
        tracing::debug!(
            target: "hew::llm",
            provider = %self.name,
            model = %self.model,
            messages = body.messages.len(),
            stream,
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(response_error(status, &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        let response = self.send(messages, tools, false).await?;
        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            ApiError::InvalidResponse("no choices in response".to_string())
        })?;

        if let Some(tool_calls) = choice.message.tool_calls {
            if !tool_calls.is_empty() {
                let calls = tool_calls
                    .into_iter()
                    .map(|call| {
                        ToolCall::new(Some(call.id), call.function.name, call.function.arguments)
                    })
                    .collect();
                return Ok(ModelTurn::ToolCalls(calls));
            }
        }

        match choice.message.content {
            Some(content) if !content.is_empty() => Ok(ModelTurn::Text(content)),
            _ => Err(ApiError::InvalidResponse(
                "response carried neither content nor tool calls".to_string(),
            )
            .into()),
        }
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<TextDeltaStream> {
        let response = self.send(messages, tools, true).await?;
        let lines = sse_data_lines(response);

        let deltas = try_stream! {
            futures::pin_mut!(lines);
            while let Some(data) = lines.next().await {
                let data = data?;
                if data == "[DONE]" {
                    break;
                }
                if let Ok(chunk) = serde_json::from_str::<WireStreamChunk>(&data) {
                    if let Some(choice) = chunk.choices.into_iter().next() {
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                yield text;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(deltas))
    }
}

// Wire types (OpenAI-compatible chat-completions schema)

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    choices: Vec<WireStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: WireStreamDelta,
}

#[derive(Debug, Deserialize)]
struct WireStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("openai", "sk-test", "http://localhost/v1/chat", "gpt-4o")
    }

    #[test]
    fn test_convert_messages_roles() {
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ];
        let wire = OpenAiCompatProvider::convert_messages(&messages);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
        assert_eq!(wire[2].content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_convert_assistant_tool_calls() {
        let messages = vec![ChatMessage::assistant_tool_calls(vec![
            ToolCall::new(Some("call_0".into()), "read_file", r#"{"path":"a"}"#),
            ToolCall::new(None, "list_files", "{}"),
        ])];
        let wire = OpenAiCompatProvider::convert_messages(&messages);
        let calls = wire[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(calls[0].function.name, "read_file");
        // A missing id falls back to its batch position.
        assert_eq!(calls[1].id, "call_1");
        assert!(wire[0].content.is_none());
    }

    #[test]
    fn test_convert_tool_result_pairs_by_call_id() {
        let messages = vec![ChatMessage::tool_result(
            "read_file",
            r#"{"success":true}"#,
            Some("call_7".into()),
        )];
        let wire = OpenAiCompatProvider::convert_messages(&messages);
        assert_eq!(wire[0].role, "tool");
        assert_eq!(wire[0].tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(wire[0].name.as_deref(), Some("read_file"));
    }

    #[test]
    fn test_build_request_omits_tools_when_empty() {
        let request = provider().build_request(&[ChatMessage::user("hi")], &[], false);
        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());
    }

    #[test]
    fn test_build_request_wraps_tools_as_functions() {
        let tools = vec![ToolDefinition {
            name: "read_file".to_string(),
            description: "Reads a file".to_string(),
            input_schema: crate::tools::SchemaBuilder::new()
                .string("path", "The relative path", true)
                .build(),
        }];
        let request = provider().build_request(&[ChatMessage::user("hi")], &tools, false);
        let wire_tools = request.tools.unwrap();
        assert_eq!(wire_tools[0].tool_type, "function");
        assert_eq!(wire_tools[0].function.name, "read_file");
        assert_eq!(wire_tools[0].function.parameters["type"], "object");
        assert_eq!(request.tool_choice, Some("auto"));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let provider =
            OpenAiCompatProvider::new("openai", "YOUR_OPENAI_API_KEY_HERE", "http://x", "m");
        assert!(provider.ensure_key().is_err());
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = provider().build_request(
            &[
                ChatMessage::user("hi"),
                ChatMessage::assistant_tool_calls(vec![ToolCall::new(
                    Some("call_0".into()),
                    "list_files",
                    "{}",
                )]),
                ChatMessage::tool_result("list_files", r#"{"success":true}"#, Some("call_0".into())),
            ],
            &[],
            false,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][1]["tool_calls"][0]["type"], "function");
        assert_eq!(json["messages"][2]["role"], "tool");
        assert_eq!(json["messages"][2]["tool_call_id"], "call_0");
    }
}
