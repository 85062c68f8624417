// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Gemini provider (wire family B)
//!
//! This schema has no system role, no tool-call ids, and groups parallel
//! tool responses into single role entries, so translation from the
//! neutral history is structural rather than 1:1:
//!
//! - the leading system message is folded into the next user message
//!   exactly once, then dropped
//! - `assistant` becomes role `model` with `functionCall` parts;
//!   `tool` becomes role `function` with `functionResponse` parts
//! - consecutive `function` entries are coalesced into one entry
//! - response batches get synthetic `call_<index>` ids so the neutral
//!   history pairs results the same way as id-bearing providers; the
//!   ids are dropped again on the way back out (pairing is positional)

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::llm::message::{ChatMessage, ModelTurn, ToolCall};
use crate::llm::provider::{ModelProvider, TextDeltaStream, ToolDefinition};

use super::{response_error, sse_data_lines};

/// Separator between the folded system prompt and the user's text.
const TASK_SEPARATOR: &str = "\n\n--- USER'S TASK ---\n\n";

const SAFETY_CATEGORIES: &[&str] = &[
    "HARASSMENT",
    "HATE_SPEECH",
    "SEXUALLY_EXPLICIT",
    "DANGEROUS_CONTENT",
];

/// Provider for the Gemini generateContent API.
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl GoogleProvider {
    /// Create a Gemini provider. `api_url` is the models base URL
    /// (e.g. `https://generativelanguage.googleapis.com/v1beta/models`).
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
        }
    }

    fn ensure_key(&self) -> Result<()> {
        if self.api_key.is_empty() || self.api_key.contains("YOUR_") {
            return Err(ApiError::MissingKey("google".to_string()).into());
        }
        Ok(())
    }

    fn build_request(messages: &[ChatMessage], tools: &[ToolDefinition]) -> GenerateRequest {
        GenerateRequest {
            contents: to_contents(messages),
            tools: if tools.is_empty() {
                None
            } else {
                Some(vec![ToolDeclarations {
                    function_declarations: tools
                        .iter()
                        .map(|tool| FunctionDeclaration {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters: tool.input_schema.as_parameters(),
                        })
                        .collect(),
                }])
            },
            tool_config: if tools.is_empty() {
                None
            } else {
                Some(ToolConfig {
                    function_calling_config: FunctionCallingConfig {
                        mode: "AUTO".to_string(),
                    },
                })
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: format!("HARM_CATEGORY_{category}"),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Result<reqwest::Response> {
        self.ensure_key()?;
        let url = if stream {
            format!(
                "{}/{}:streamGenerateContent?key={}&alt=sse",
                self.api_url, self.model, self.api_key
            )
        } else {
            format!(
                "{}/{}:generateContent?key={}",
                self.api_url, self.model, self.api_key
            )
        };

        let body = Self::build_request(messages, tools);
        tracing::debug!(
            target: "hew::llm",
            provider = "google",
            model = %self.model,
            contents = body.contents.len(),
            stream,
            "sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
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
impl ModelProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        let response = self.send(messages, tools, false).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        parse_response(body)
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
                if let Ok(chunk) = serde_json::from_str::<GenerateResponse>(&data) {
                    if let Some(text) = chunk
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|candidate| candidate.content)
                        .and_then(|content| content.parts.into_iter().next())
                        .and_then(|part| part.text)
                    {
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(deltas))
    }
}

/// Translate the neutral history into Gemini contents.
fn to_contents(messages: &[ChatMessage]) -> Vec<Content> {
    let mut pending_system = match messages.first() {
        Some(ChatMessage::System { content }) => Some(content.clone()),
        _ => None,
    };

    let mut contents = Vec::new();
    for message in messages {
        match message {
            // This schema has no system role; the prompt rides on the
            // next user message instead.
            ChatMessage::System { .. } => continue,

            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                if tool_calls.is_empty() {
                    contents.push(Content {
                        role: "model".to_string(),
                        parts: vec![Part::text(content.clone().unwrap_or_default())],
                    });
                } else {
                    let parts = tool_calls
                        .iter()
                        .map(|call| {
                            // A malformed argument encoding degrades to an
                            // empty mapping rather than failing the whole
                            // translation.
                            Part::function_call(call.name.clone(), call.arguments_or_empty())
                        })
                        .collect();
                    contents.push(Content {
                        role: "model".to_string(),
                        parts,
                    });
                }
            }

            ChatMessage::Tool { name, content, .. } => {
                let payload = serde_json::from_str::<serde_json::Value>(content)
                    .unwrap_or_else(|_| serde_json::Value::String(content.clone()));
                contents.push(Content {
                    role: "function".to_string(),
                    parts: vec![Part::function_response(
                        name.clone(),
                        serde_json::json!({ "content": payload }),
                    )],
                });
            }

            ChatMessage::User { content } => {
                let text = match pending_system.take() {
                    Some(system) => format!("{system}{TASK_SEPARATOR}{content}"),
                    None => content.clone(),
                };
                contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![Part::text(text)],
                });
            }
        }
    }

    coalesce_function_responses(contents)
}

/// Merge consecutive `function`-role entries into one entry whose parts
/// concatenate in original order. Gemini expects all parallel tool
/// responses from one round grouped this way.
fn coalesce_function_responses(contents: Vec<Content>) -> Vec<Content> {
    let mut merged: Vec<Content> = Vec::with_capacity(contents.len());
    for content in contents {
        if content.role == "function" {
            if let Some(last) = merged.last_mut() {
                if last.role == "function" {
                    last.parts.extend(content.parts);
                    continue;
                }
            }
        }
        merged.push(content);
    }
    merged
}

/// Parse a generateContent response into a model turn, assigning
/// synthetic `call_<index>` ids to the batch.
fn parse_response(body: GenerateResponse) -> Result<ModelTurn> {
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::InvalidResponse("no candidates in response".to_string()))?;

    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    let calls: Vec<ToolCall> = parts
        .iter()
        .filter_map(|part| part.function_call.clone())
        .enumerate()
        .map(|(index, call)| {
            ToolCall::new(
                Some(format!("call_{index}")),
                call.name,
                serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_string()),
            )
        })
        .collect();

    if !calls.is_empty() {
        return Ok(ModelTurn::ToolCalls(calls));
    }

    if let Some(text) = parts.into_iter().next().and_then(|part| part.text) {
        return Ok(ModelTurn::Text(text));
    }

    Err(ApiError::InvalidResponse("no text or function calls in candidate".to_string()).into())
}

// Wire types (Gemini generateContent schema)

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclarations>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: String) -> Self {
        Part {
            text: Some(text),
            ..Default::default()
        }
    }

    fn function_call(name: String, args: serde_json::Value) -> Self {
        Part {
            function_call: Some(FunctionCall { name, args }),
            ..Default::default()
        }
    }

    fn function_response(name: String, response: serde_json::Value) -> Self {
        Part {
            function_response: Some(FunctionResponse { name, response }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prefix_folded_into_next_user_message_once() {
        let messages = vec![
            ChatMessage::system("You are an agent."),
            ChatMessage::user("first"),
            ChatMessage::assistant("ok"),
            ChatMessage::user("second"),
        ];
        let contents = to_contents(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, "user");
        let first = contents[0].parts[0].text.as_ref().unwrap();
        assert!(first.starts_with("You are an agent."));
        assert!(first.contains("USER'S TASK"));
        assert!(first.ends_with("first"));
        // Applied exactly once: the second user message is untouched.
        assert_eq!(contents[2].parts[0].text.as_deref(), Some("second"));
    }

    #[test]
    fn test_assistant_relabeled_as_model() {
        let contents = to_contents(&[ChatMessage::assistant("hi")]);
        assert_eq!(contents[0].role, "model");
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("hi"));
    }

    #[test]
    fn test_tool_calls_become_function_call_parts() {
        let contents = to_contents(&[ChatMessage::assistant_tool_calls(vec![
            ToolCall::new(Some("call_0".into()), "read_file", r#"{"path":"a.txt"}"#),
            ToolCall::new(Some("call_1".into()), "list_files", r#"{"path":"."}"#),
        ])]);
        assert_eq!(contents[0].role, "model");
        assert_eq!(contents[0].parts.len(), 2);
        let call = contents[0].parts[0].function_call.as_ref().unwrap();
        assert_eq!(call.name, "read_file");
        assert_eq!(call.args["path"], "a.txt");
    }

    #[test]
    fn test_malformed_arguments_degrade_to_empty_mapping() {
        let contents = to_contents(&[ChatMessage::assistant_tool_calls(vec![ToolCall::new(
            Some("call_0".into()),
            "read_file",
            "{broken",
        )])]);
        let call = contents[0].parts[0].function_call.as_ref().unwrap();
        assert_eq!(call.args, serde_json::json!({}));
    }

    #[test]
    fn test_tool_result_wrapped_as_function_response() {
        let contents = to_contents(&[ChatMessage::tool_result(
            "write_file",
            r#"{"success":true,"message":"done"}"#,
            Some("call_0".into()),
        )]);
        assert_eq!(contents[0].role, "function");
        let response = contents[0].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.name, "write_file");
        assert_eq!(response.response["content"]["success"], true);
    }

    #[test]
    fn test_consecutive_function_entries_coalesce() {
        let contents = to_contents(&[
            ChatMessage::assistant_tool_calls(vec![
                ToolCall::new(Some("call_0".into()), "read_file", r#"{"path":"a"}"#),
                ToolCall::new(Some("call_1".into()), "read_file", r#"{"path":"b"}"#),
            ]),
            ChatMessage::tool_result("read_file", r#"{"success":true}"#, Some("call_0".into())),
            ChatMessage::tool_result("read_file", r#"{"success":false}"#, Some("call_1".into())),
            ChatMessage::assistant("done"),
        ]);
        // model, function (merged), model
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role, "function");
        assert_eq!(contents[1].parts.len(), 2);
        assert_eq!(contents[2].role, "model");
    }

    #[test]
    fn test_parse_response_assigns_synthetic_ids_in_order() {
        let body = GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: "model".to_string(),
                    parts: vec![
                        Part::function_call(
                            "read_file".to_string(),
                            serde_json::json!({"path": "a.txt"}),
                        ),
                        Part::function_call(
                            "write_file".to_string(),
                            serde_json::json!({"path": "b.txt", "content": "x"}),
                        ),
                    ],
                }),
            }],
        };
        match parse_response(body).unwrap() {
            ModelTurn::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].id.as_deref(), Some("call_0"));
                assert_eq!(calls[1].id.as_deref(), Some("call_1"));
                assert_eq!(calls[0].name, "read_file");
                assert_eq!(calls[1].name, "write_file");
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_text() {
        let body = GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: "model".to_string(),
                    parts: vec![Part::text("All done. TASK_FINISHED".to_string())],
                }),
            }],
        };
        match parse_response(body).unwrap() {
            ModelTurn::Text(text) => assert!(text.contains("TASK_FINISHED")),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_empty_candidates_is_invalid() {
        let body = GenerateResponse { candidates: vec![] };
        assert!(parse_response(body).is_err());
    }

    #[test]
    fn test_round_trip_preserves_batch_order_and_arguments() {
        // Neutral batch -> Family B contents -> parsed back: order and
        // name/argument mappings survive, ids are reassigned by position.
        let batch = vec![
            ToolCall::new(Some("call_0".into()), "read_file", r#"{"path":"a.txt"}"#),
            ToolCall::new(
                Some("call_1".into()),
                "apply_file_edit",
                r#"{"path":"a.txt","search_block":"x","replace_block":"y"}"#,
            ),
        ];
        let contents = to_contents(&[ChatMessage::assistant_tool_calls(batch.clone())]);

        let body = GenerateResponse {
            candidates: vec![Candidate {
                content: Some(contents.into_iter().next().unwrap()),
            }],
        };
        match parse_response(body).unwrap() {
            ModelTurn::ToolCalls(parsed) => {
                assert_eq!(parsed.len(), batch.len());
                for (round_tripped, original) in parsed.iter().zip(&batch) {
                    assert_eq!(round_tripped.name, original.name);
                    assert_eq!(round_tripped.id, original.id);
                    assert_eq!(
                        round_tripped.parse_arguments().unwrap(),
                        original.parse_arguments().unwrap()
                    );
                }
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_request_omits_tools_when_empty() {
        let request = GoogleProvider::build_request(&[ChatMessage::user("hi")], &[]);
        assert!(request.tools.is_none());
        assert!(request.tool_config.is_none());
        assert_eq!(request.safety_settings.len(), 4);
    }
}
