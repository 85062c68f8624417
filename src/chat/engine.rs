// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! The bounded agent loop
//!
//! Per user turn: invoke the model, dispatch any returned tool calls
//! sequentially in the order received, append results, repeat. A plain
//! text reply ends the turn unconditionally; the safety step bound ends
//! it with the accumulated history intact so the conversation stays
//! resumable. Transport errors propagate without appending an assistant
//! message, leaving no dangling tool call behind.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;

use crate::error::Result;
use crate::llm::message::{ChatMessage, ModelTurn};
use crate::llm::provider::{ModelProvider, ToolDefinition};
use crate::tools::ToolDispatcher;

use super::prompt::COMPLETION_MARKER;
use super::session::ChatSession;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered with text. `finished` reports whether the
    /// completion marker was present; informational only.
    Completed { finished: bool },
    /// The safety bound was reached; history is intact and resumable.
    StepLimit { steps: usize },
    /// The interrupt flag was raised between steps.
    Interrupted,
}

/// Output hooks for the loop. Frontends implement this to render
/// progress; every method has a no-op default.
pub trait TurnObserver {
    fn on_step(&mut self, _step: usize, _max_steps: usize) {}
    fn on_tool_call(&mut self, _name: &str, _arguments: &str) {}
    fn on_tool_result(&mut self, _name: &str, _result: &serde_json::Value) {}
    fn on_text_delta(&mut self, _delta: &str) {}
    fn on_reply(&mut self, _text: &str) {}
}

/// Observer that renders nothing.
#[derive(Debug, Default)]
pub struct NoopTurnObserver;

impl TurnObserver for NoopTurnObserver {}

/// Run one user turn to completion.
///
/// Any staged workspace context is injected into the latest user message
/// exactly once before the first model call. When `stream_final` is set,
/// the model call following a tool round is streamed and its text deltas
/// surfaced through the observer.
pub async fn run_turn(
    provider: &dyn ModelProvider,
    session: &mut ChatSession,
    dispatcher: &ToolDispatcher,
    stream_final: bool,
    interrupted: &AtomicBool,
    observer: &mut dyn TurnObserver,
) -> Result<TurnOutcome> {
    session.inject_pending_context();
    let tools = ToolDispatcher::definitions();
    let max_steps = session.max_steps();

    for step in 1..=max_steps {
        if interrupted.load(Ordering::SeqCst) {
            tracing::info!(target: "hew::engine", step, "turn interrupted");
            return Ok(TurnOutcome::Interrupted);
        }
        observer.on_step(step, max_steps);
        tracing::debug!(
            target: "hew::engine",
            step,
            max_steps,
            messages = session.len(),
            "requesting model response"
        );

        let turn = request_model_turn(provider, session, &tools, stream_final, observer).await?;

        match turn {
            ModelTurn::ToolCalls(calls) => {
                tracing::info!(
                    target: "hew::engine",
                    step,
                    calls = calls.len(),
                    "executing tool batch"
                );
                session.push_tool_calls(calls.clone());

                // Sequential, in order received: a later call in the
                // batch may depend on a file state written by an
                // earlier one.
                for call in &calls {
                    observer.on_tool_call(&call.name, &call.arguments);
                    let result = dispatcher.dispatch_call(call);
                    observer.on_tool_result(&call.name, &result);
                    let content = serde_json::to_string(&result)?;
                    session.push(ChatMessage::tool_result(
                        call.name.clone(),
                        content,
                        call.id.clone(),
                    ));
                }
            }
            ModelTurn::Text(content) => {
                // Any text reply ends the turn; the marker is a signal
                // for the surrounding UI, not a loop condition.
                let finished = content.contains(COMPLETION_MARKER);
                observer.on_reply(&content);
                session.push(ChatMessage::assistant(content));
                tracing::info!(target: "hew::engine", step, finished, "turn completed");
                return Ok(TurnOutcome::Completed { finished });
            }
        }
    }

    tracing::warn!(
        target: "hew::engine",
        max_steps,
        "safety step limit reached; pausing turn"
    );
    Ok(TurnOutcome::StepLimit { steps: max_steps })
}

/// Request the next model turn, streaming when the previous message was
/// a tool result and streaming is enabled.
///
/// The streamed wire variants only carry text deltas; if the streamed
/// body turns out to carry none (the model chose another tool call), the
/// request is re-issued without streaming.
async fn request_model_turn(
    provider: &dyn ModelProvider,
    session: &ChatSession,
    tools: &[ToolDefinition],
    stream_final: bool,
    observer: &mut dyn TurnObserver,
) -> Result<ModelTurn> {
    let after_tool_round = session
        .messages()
        .last()
        .map(ChatMessage::is_tool_result)
        .unwrap_or(false);

    if stream_final && after_tool_round {
        let mut stream = provider.complete_stream(session.messages(), tools).await?;
        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            let delta = delta?;
            observer.on_text_delta(&delta);
            text.push_str(&delta);
        }
        if !text.is_empty() {
            return Ok(ModelTurn::Text(text));
        }
        tracing::debug!(
            target: "hew::engine",
            "streamed response carried no text; retrying without streaming"
        );
    }

    provider.complete(session.messages(), tools).await
}
