// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Chat session state
//!
//! Owns the conversation history and the pending workspace context. The
//! first message is always the fixed system prompt; every tool call in
//! the history is answered by exactly one tool message before the next
//! model invocation.

use crate::llm::message::{ChatMessage, ToolCall};

use super::prompt::AGENT_PROMPT;

/// Default safety bound on model round-trips per turn.
pub const DEFAULT_MAX_STEPS: usize = 15;

/// State of a single chat session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    pending_context: Option<String>,
    max_steps: usize,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Create a session with the agent prompt installed.
    pub fn new() -> Self {
        Self::with_max_steps(DEFAULT_MAX_STEPS)
    }

    /// Create a session with a custom step bound.
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            messages: vec![ChatMessage::system(AGENT_PROMPT)],
            pending_context: None,
            max_steps: max_steps.max(1),
        }
    }

    /// Reset to a fresh session: system prompt only, pending context
    /// dropped.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::system(AGENT_PROMPT));
        self.pending_context = None;
    }

    /// The full history, system prompt first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages in the history.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether only the system prompt is present.
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    /// The configured step bound.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Append a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Append an assistant message carrying a tool-call batch.
    pub fn push_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.messages.push(ChatMessage::assistant_tool_calls(calls));
    }

    /// Stage a context blob for injection into the next turn.
    pub fn set_pending_context(&mut self, blob: String) {
        self.pending_context = Some(blob);
    }

    /// Drop any staged context.
    pub fn clear_pending_context(&mut self) {
        self.pending_context = None;
    }

    /// Whether a context blob is staged.
    pub fn has_pending_context(&self) -> bool {
        self.pending_context.is_some()
    }

    /// Size in bytes of the staged context, if any.
    pub fn pending_context_len(&self) -> Option<usize> {
        self.pending_context.as_ref().map(String::len)
    }

    /// Prepend the staged context to the most recent user message.
    ///
    /// Happens at most once per turn: the blob is consumed whether or
    /// not a user message was found. Returns true if it was applied.
    pub fn inject_pending_context(&mut self) -> bool {
        let Some(blob) = self.pending_context.take() else {
            return false;
        };
        for message in self.messages.iter_mut().rev() {
            if let ChatMessage::User { content } = message {
                *content = format!("{blob}\n--- User's Prompt ---\n{content}");
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Role;

    #[test]
    fn test_new_session_starts_with_system_prompt() {
        let session = ChatSession::new();
        assert_eq!(session.len(), 1);
        assert_eq!(session.messages()[0].role(), Role::System);
        assert!(session.is_empty());
    }

    #[test]
    fn test_reset_reinstalls_system_prompt_and_drops_context() {
        let mut session = ChatSession::new();
        session.push_user("hello");
        session.set_pending_context("ctx".to_string());

        session.reset();
        assert_eq!(session.len(), 1);
        assert_eq!(session.messages()[0].role(), Role::System);
        assert!(!session.has_pending_context());
    }

    #[test]
    fn test_inject_pending_context_prepends_once() {
        let mut session = ChatSession::new();
        session.push_user("do the thing");
        session.set_pending_context("FILES...".to_string());

        assert!(session.inject_pending_context());
        let content = session.messages().last().unwrap().text().unwrap();
        assert!(content.starts_with("FILES..."));
        assert!(content.contains("--- User's Prompt ---"));
        assert!(content.ends_with("do the thing"));

        // Consumed: a second injection is a no-op.
        assert!(!session.inject_pending_context());
    }

    #[test]
    fn test_inject_targets_latest_user_message() {
        let mut session = ChatSession::new();
        session.push_user("first");
        session.push(crate::llm::message::ChatMessage::assistant("reply"));
        session.push_user("second");
        session.set_pending_context("CTX".to_string());

        session.inject_pending_context();
        assert_eq!(session.messages()[1].text(), Some("first"));
        assert!(session.messages()[3].text().unwrap().starts_with("CTX"));
    }

    #[test]
    fn test_inject_without_user_message_consumes_blob() {
        let mut session = ChatSession::new();
        session.set_pending_context("CTX".to_string());
        assert!(!session.inject_pending_context());
        assert!(!session.has_pending_context());
    }

    #[test]
    fn test_max_steps_floor() {
        let session = ChatSession::with_max_steps(0);
        assert_eq!(session.max_steps(), 1);
    }
}
