// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Provider factory
//!
//! Chooses the wire-format family for a configured provider name once at
//! session start; the orchestration loop only ever sees the
//! [`ModelProvider`] interface.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{HewError, Result};
use crate::llm::provider::ModelProvider;
use crate::llm::providers::{GoogleProvider, OpenAiCompatProvider};

/// Factory for creating LLM providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider from its configured name.
    ///
    /// `google` speaks the nested-contents schema; every other
    /// configured provider is served by the OpenAI-compatible
    /// implementation pointed at its own endpoint. API keys are checked
    /// lazily at request time so a key can still be supplied via `/api`
    /// after startup.
    pub fn create(name: &str, settings: &Settings) -> Result<Arc<dyn ModelProvider>> {
        let provider = settings.provider(name).ok_or_else(|| {
            HewError::Config(format!(
                "Unknown provider '{name}'. Configured providers: {}",
                settings.provider_names().join(", ")
            ))
        })?;

        match name {
            "google" => Ok(Arc::new(GoogleProvider::new(
                &provider.api_key,
                &provider.api_url,
                &provider.model,
            ))),
            _ => Ok(Arc::new(OpenAiCompatProvider::new(
                name,
                &provider.api_key,
                &provider.api_url,
                &provider.model,
            ))),
        }
    }
}
