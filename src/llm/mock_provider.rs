// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Mock LLM provider for testing
//!
//! A scriptable implementation of the provider trait so the agent loop
//! can be exercised without network access. Queued turns are returned in
//! order; the last turn repeats once the queue is exhausted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::error::Result;
use crate::llm::message::{ChatMessage, ModelTurn, ToolCall};
use crate::llm::provider::{ModelProvider, TextDeltaStream, ToolDefinition};

/// A mock provider with a scripted sequence of turns.
#[derive(Clone)]
pub struct MockProvider {
    turns: Arc<Mutex<Vec<ModelTurn>>>,
    call_count: Arc<AtomicUsize>,
    recorded_requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a mock that answers every request with a plain text reply.
    pub fn new() -> Self {
        Self::with_turns(vec![ModelTurn::Text("Done. TASK_FINISHED".to_string())])
    }

    /// Create a mock with a scripted sequence of turns. The final turn
    /// repeats for any request past the end of the script.
    pub fn with_turns(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns)),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that requests the same tool call on every step,
    /// never terminating on its own.
    pub fn always_tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::with_turns(vec![ModelTurn::ToolCalls(vec![ToolCall::new(
            Some("call_0".to_string()),
            name,
            arguments.to_string(),
        )])])
    }

    /// Number of completed `complete`/`complete_stream` invocations.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Message histories seen by each invocation, in order.
    pub fn recorded_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.recorded_requests.lock().unwrap().clone()
    }

    fn next_turn(&self, messages: &[ChatMessage]) -> ModelTurn {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded_requests
            .lock()
            .unwrap()
            .push(messages.to_vec());
        let turns = self.turns.lock().unwrap();
        if turns.is_empty() {
            ModelTurn::Text(String::new())
        } else {
            turns[index.min(turns.len() - 1)].clone()
        }
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        Ok(self.next_turn(messages))
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<TextDeltaStream> {
        // Text turns stream their content as a single delta; tool-call
        // turns stream nothing, mirroring the wire parsers which only
        // surface text.
        let deltas: Vec<Result<String>> = match self.next_turn(messages) {
            ModelTurn::Text(text) if !text.is_empty() => vec![Ok(text)],
            _ => vec![],
        };
        Ok(Box::pin(stream::iter(deltas)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_scripted_turns_in_order_then_repeat() {
        let mock = MockProvider::with_turns(vec![
            ModelTurn::Text("one".to_string()),
            ModelTurn::Text("two".to_string()),
        ]);
        let messages = [ChatMessage::user("hi")];

        assert_eq!(
            mock.complete(&messages, &[]).await.unwrap(),
            ModelTurn::Text("one".to_string())
        );
        assert_eq!(
            mock.complete(&messages, &[]).await.unwrap(),
            ModelTurn::Text("two".to_string())
        );
        // Last turn repeats.
        assert_eq!(
            mock.complete(&messages, &[]).await.unwrap(),
            ModelTurn::Text("two".to_string())
        );
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_records_request_histories() {
        let mock = MockProvider::new();
        mock.complete(&[ChatMessage::user("first")], &[])
            .await
            .unwrap();
        let recorded = mock.recorded_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0][0].text(), Some("first"));
    }

    #[tokio::test]
    async fn test_stream_yields_text_delta() {
        let mock = MockProvider::with_turns(vec![ModelTurn::Text("streamed".to_string())]);
        let mut stream = mock
            .complete_stream(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap();
        let mut collected = String::new();
        while let Some(delta) = stream.next().await {
            collected.push_str(&delta.unwrap());
        }
        assert_eq!(collected, "streamed");
    }

    #[tokio::test]
    async fn test_stream_is_empty_for_tool_call_turn() {
        let mock = MockProvider::always_tool_call("list_files", serde_json::json!({}));
        let mut stream = mock
            .complete_stream(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap();
        assert!(stream.next().await.is_none());
    }
}
