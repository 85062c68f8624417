// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Settings management for Hew
//!
//! Handles loading and saving settings from ~/.hew/settings.json
//! (or `$HEW_HOME/settings.json`). Missing keys are filled from defaults
//! on load; unknown keys from other versions or hand edits are preserved
//! on save via a deep merge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Key of the provider used for new sessions
    #[serde(default = "default_active_provider")]
    pub active_provider: String,

    /// Whether payload-level debug logging is enabled at startup
    #[serde(default)]
    pub debug_mode: bool,

    /// Workspace directory restored on startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<PathBuf>,

    /// Safety bound on model round-trips per turn
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Per-provider endpoint configuration
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderSettings>,
}

/// Endpoint configuration for one provider
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    /// API key; values still carrying the `YOUR_` placeholder count as unset
    #[serde(default)]
    pub api_key: String,

    /// Endpoint URL
    #[serde(default)]
    pub api_url: String,

    /// Model identifier
    #[serde(default)]
    pub model: String,
}

impl ProviderSettings {
    fn new(api_key: &str, api_url: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
            model: model.to_string(),
        }
    }

    /// Whether a usable API key is configured.
    pub fn has_key(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.contains("YOUR_")
    }
}

fn default_active_provider() -> String {
    "google".to_string()
}

fn default_max_steps() -> usize {
    15
}

fn default_providers() -> BTreeMap<String, ProviderSettings> {
    BTreeMap::from([
        (
            "google".to_string(),
            ProviderSettings::new(
                "YOUR_GOOGLE_AI_STUDIO_API_KEY_HERE",
                "https://generativelanguage.googleapis.com/v1beta/models",
                "gemini-2.0-flash",
            ),
        ),
        (
            "openai".to_string(),
            ProviderSettings::new(
                "YOUR_OPENAI_API_KEY_HERE",
                "https://api.openai.com/v1/chat/completions",
                "gpt-4o",
            ),
        ),
        (
            "openrouter".to_string(),
            ProviderSettings::new(
                "YOUR_OPENROUTER_KEY_HERE",
                "https://openrouter.ai/api/v1/chat/completions",
                "anthropic/claude-3.5-sonnet",
            ),
        ),
        (
            "groq".to_string(),
            ProviderSettings::new(
                "YOUR_GROQ_API_KEY_HERE",
                "https://api.groq.com/openai/v1/chat/completions",
                "llama3-70b-8192",
            ),
        ),
        (
            "lmstudio".to_string(),
            ProviderSettings::new(
                "lm-studio",
                "http://localhost:1234/v1/chat/completions",
                "local-model",
            ),
        ),
    ])
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active_provider: default_active_provider(),
            debug_mode: false,
            workspace_path: None,
            max_steps: default_max_steps(),
            providers: default_providers(),
        }
    }
}

impl Settings {
    /// Get the hew home directory (~/.hew or $HEW_HOME).
    pub fn hew_home() -> PathBuf {
        if let Ok(home) = std::env::var("HEW_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hew")
    }

    /// Get the default settings file path.
    pub fn default_path() -> PathBuf {
        Self::hew_home().join("settings.json")
    }

    /// Load settings from a specific path, filling missing keys from the
    /// defaults. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&content)?;
        settings.fill_missing_defaults();
        Ok(settings)
    }

    /// Save settings to a specific path, merging with existing file
    /// content to preserve unknown keys from other versions or hand
    /// edits.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let new_value = serde_json::to_value(self)?;
        let merged = if path.exists() {
            let existing = std::fs::read_to_string(path)?;
            match serde_json::from_str::<serde_json::Value>(&existing) {
                Ok(existing_value) => deep_merge(existing_value, new_value),
                // Corrupt file, overwrite entirely.
                Err(_) => new_value,
            }
        } else {
            new_value
        };

        std::fs::write(path, serde_json::to_string_pretty(&merged)?)?;
        Ok(())
    }

    /// Look up a provider by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }

    /// Mutable lookup, inserting defaults for a known-but-missing entry.
    pub fn provider_mut(&mut self, name: &str) -> Option<&mut ProviderSettings> {
        self.providers.get_mut(name)
    }

    /// The active provider's configuration.
    pub fn active(&self) -> Option<&ProviderSettings> {
        self.providers.get(&self.active_provider)
    }

    /// Names of all configured providers, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Add default entries for providers absent from a loaded file and
    /// default fields left empty inside present entries.
    fn fill_missing_defaults(&mut self) {
        for (name, defaults) in default_providers() {
            let entry = self
                .providers
                .entry(name)
                .or_insert_with(|| defaults.clone());
            if entry.api_url.is_empty() {
                entry.api_url = defaults.api_url.clone();
            }
            if entry.model.is_empty() {
                entry.model = defaults.model.clone();
            }
        }
    }
}

/// Recursively merge `overlay` onto `base`; overlay values win, objects
/// merge key-wise.
fn deep_merge(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    match (base, overlay) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}
