// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Wire-format tests for both provider families against a mock HTTP
//! server: request shape, response parsing, and SSE streaming.

use futures_util::StreamExt;
use hew::error::{ApiError, HewError};
use hew::llm::providers::{GoogleProvider, OpenAiCompatProvider};
use hew::llm::{ChatMessage, ModelProvider, ModelTurn, ToolCall};
use hew::tools::ToolDispatcher;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_provider(server: &MockServer) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(
        "openai",
        "sk-test",
        format!("{}/v1/chat/completions", server.uri()),
        "gpt-4o",
    )
}

fn google_provider(server: &MockServer) -> GoogleProvider {
    GoogleProvider::new(
        "test-key",
        format!("{}/v1beta/models", server.uri()),
        "gemini-2.0-flash",
    )
}

fn sample_history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are an agent."),
        ChatMessage::user("list then read"),
        ChatMessage::assistant_tool_calls(vec![
            ToolCall::new(Some("call_0".into()), "list_files", json!({}).to_string()),
            ToolCall::new(
                Some("call_1".into()),
                "read_file",
                json!({"path": "a.txt"}).to_string(),
            ),
        ]),
        ChatMessage::tool_result(
            "list_files",
            json!({"success": true, "files": ["a.txt"]}).to_string(),
            Some("call_0".into()),
        ),
        ChatMessage::tool_result(
            "read_file",
            json!({"success": true, "content": "alpha"}).to_string(),
            Some("call_1".into()),
        ),
    ]
}

#[tokio::test]
async fn test_openai_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "ok" } }]
        })))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let tools = ToolDispatcher::definitions();
    provider.complete(&sample_history(), &tools).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();

    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["stream"], false);
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"].as_array().unwrap().len(), 6);
    assert_eq!(body["tools"][0]["type"], "function");

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(messages[2]["tool_calls"][1]["id"], "call_1");
    assert_eq!(messages[2]["tool_calls"][1]["function"]["name"], "read_file");
    // Tool results answer by id, in order.
    assert_eq!(messages[3]["role"], "tool");
    assert_eq!(messages[3]["tool_call_id"], "call_0");
    assert_eq!(messages[4]["tool_call_id"], "call_1");
}

#[tokio::test]
async fn test_openai_parses_tool_call_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "write_file",
                            "arguments": "{\"path\":\"x.txt\",\"content\":\"hi\"}"
                        }
                    }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let turn = provider
        .complete(&[ChatMessage::user("write")], &[])
        .await
        .unwrap();

    match turn {
        ModelTurn::ToolCalls(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id.as_deref(), Some("call_abc"));
            assert_eq!(calls[0].name, "write_file");
            assert_eq!(calls[0].parse_arguments().unwrap()["path"], "x.txt");
        }
        other => panic!("expected tool calls, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_auth_failure_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "bad key"}})),
        )
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let err = provider
        .complete(&[ChatMessage::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HewError::Api(ApiError::AuthenticationFailed)
    ));
}

#[tokio::test]
async fn test_openai_streaming_surfaces_text_deltas() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let mut stream = provider
        .complete_stream(&[ChatMessage::user("hi")], &[])
        .await
        .unwrap();

    let mut collected = String::new();
    while let Some(delta) = stream.next().await {
        collected.push_str(&delta.unwrap());
    }
    assert_eq!(collected, "Hello");
}

#[tokio::test]
async fn test_openai_missing_key_fails_before_any_request() {
    let server = MockServer::start().await;
    let provider = OpenAiCompatProvider::new(
        "openai",
        "YOUR_OPENAI_API_KEY_HERE",
        format!("{}/v1/chat/completions", server.uri()),
        "gpt-4o",
    );
    let err = provider
        .complete(&[ChatMessage::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, HewError::Api(ApiError::MissingKey(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_google_request_shape_with_coalesced_function_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "ok" }] } }]
        })))
        .mount(&server)
        .await;

    let provider = google_provider(&server);
    let tools = ToolDispatcher::definitions();
    provider.complete(&sample_history(), &tools).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();

    let contents = body["contents"].as_array().unwrap();
    // user (with folded system), model batch, one merged function entry.
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    let first_text = contents[0]["parts"][0]["text"].as_str().unwrap();
    assert!(first_text.starts_with("You are an agent."));
    assert!(first_text.contains("list then read"));

    assert_eq!(contents[1]["role"], "model");
    assert_eq!(
        contents[1]["parts"][0]["functionCall"]["name"],
        "list_files"
    );
    // No ids anywhere on this wire.
    assert!(contents[1]["parts"][0]["functionCall"].get("id").is_none());

    assert_eq!(contents[2]["role"], "function");
    assert_eq!(contents[2]["parts"].as_array().unwrap().len(), 2);
    assert_eq!(
        contents[2]["parts"][1]["functionResponse"]["name"],
        "read_file"
    );

    assert_eq!(
        body["tools"][0]["function_declarations"].as_array().unwrap().len(),
        6
    );
    assert_eq!(
        body["tool_config"]["function_calling_config"]["mode"],
        "AUTO"
    );
}

#[tokio::test]
async fn test_google_tool_calls_get_synthetic_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "functionCall": { "name": "list_files", "args": {} } },
                        { "functionCall": { "name": "read_file", "args": { "path": "a.txt" } } }
                    ]
                }
            }]
        })))
        .mount(&server)
        .await;

    let provider = google_provider(&server);
    let turn = provider
        .complete(&[ChatMessage::user("go")], &[])
        .await
        .unwrap();

    match turn {
        ModelTurn::ToolCalls(calls) => {
            assert_eq!(calls[0].id.as_deref(), Some("call_0"));
            assert_eq!(calls[1].id.as_deref(), Some("call_1"));
            assert_eq!(calls[1].name, "read_file");
            assert_eq!(calls[1].parse_arguments().unwrap()["path"], "a.txt");
        }
        other => panic!("expected tool calls, got {:?}", other),
    }
}

#[tokio::test]
async fn test_google_streaming_uses_sse_alt() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hi \"}]}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"there\"}]}}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = google_provider(&server);
    let mut stream = provider
        .complete_stream(&[ChatMessage::user("hi")], &[])
        .await
        .unwrap();

    let mut collected = String::new();
    while let Some(delta) = stream.next().await {
        collected.push_str(&delta.unwrap());
    }
    assert_eq!(collected, "Hi there");
}

#[tokio::test]
async fn test_google_server_error_is_fatal_to_the_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = google_provider(&server);
    let err = provider
        .complete(&[ChatMessage::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HewError::Api(ApiError::ServerError { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_verify_probe_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "Success" } }]
        })))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    assert_eq!(provider.verify().await.unwrap(), "Success");

    // The probe sends no tools.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("tools").is_none());
}
