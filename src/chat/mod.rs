// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Chat runtime
//!
//! [`Agent`] is the application facade: it owns the settings, the
//! workspace handle, the session history, and the provider chosen at
//! session start. All of that state lives here explicitly; there are no
//! process-wide singletons.

pub mod commands;
pub mod engine;
pub mod prompt;
pub mod session;

pub use commands::{handle_command, CommandAction};
pub use engine::{run_turn, NoopTurnObserver, TurnObserver, TurnOutcome};
pub use prompt::{AGENT_PROMPT, COMPLETION_MARKER};
pub use session::ChatSession;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{HewError, Result};
use crate::llm::provider::ModelProvider;
use crate::llm::ProviderFactory;
use crate::tools::ToolDispatcher;
use crate::workspace::Workspace;

/// Application state shared by the REPL and the slash commands.
pub struct Agent {
    /// Persisted configuration
    pub settings: Settings,
    /// Where configuration is saved
    pub settings_path: PathBuf,
    /// Sandboxed workspace, if one is set
    pub workspace: Option<Arc<Workspace>>,
    /// Conversation state
    pub session: ChatSession,
    /// Provider chosen at session start
    pub provider: Arc<dyn ModelProvider>,
}

impl Agent {
    /// Build the agent from loaded settings. A configured workspace path
    /// that no longer exists is dropped with a warning rather than
    /// failing startup.
    pub fn new(settings: Settings, settings_path: PathBuf) -> Result<Self> {
        let provider = ProviderFactory::create(&settings.active_provider, &settings)?;

        let workspace = match settings.workspace_path.as_deref() {
            Some(path) => match Workspace::open(path) {
                Ok(workspace) => Some(Arc::new(workspace)),
                Err(e) => {
                    tracing::warn!(
                        target: "hew::chat",
                        path = %path.display(),
                        error = %e,
                        "configured workspace is unusable; starting without one"
                    );
                    None
                }
            },
            None => None,
        };

        let session = ChatSession::with_max_steps(settings.max_steps);

        Ok(Self {
            settings,
            settings_path,
            workspace,
            session,
            provider,
        })
    }

    /// Set the workspace directory. Starts a new session: history is
    /// meaningless across roots.
    pub fn set_workspace(&mut self, path: &Path) -> Result<()> {
        let workspace = Workspace::open(path)?;
        self.settings.workspace_path = Some(workspace.root().to_path_buf());
        self.settings.save_to(&self.settings_path)?;
        self.workspace = Some(Arc::new(workspace));
        self.session.reset();
        Ok(())
    }

    /// Switch the active provider. Starts a new session.
    pub fn switch_provider(&mut self, name: &str) -> Result<()> {
        let provider = ProviderFactory::create(name, &self.settings)?;
        self.settings.active_provider = name.to_string();
        self.settings.save_to(&self.settings_path)?;
        self.provider = provider;
        self.session.reset();
        Ok(())
    }

    /// Rebuild the provider after its settings changed (model or key).
    pub fn refresh_provider(&mut self) -> Result<()> {
        self.provider = ProviderFactory::create(&self.settings.active_provider, &self.settings)?;
        Ok(())
    }

    /// Run one user turn through the agent loop.
    pub async fn run_user_turn(
        &mut self,
        input: &str,
        stream_final: bool,
        interrupted: &AtomicBool,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        let Some(workspace) = self.workspace.clone() else {
            return Err(HewError::Config(
                "No workspace is set. Use /workspace <path>.".to_string(),
            ));
        };

        self.session.push_user(input);
        let dispatcher = ToolDispatcher::new(workspace);
        run_turn(
            self.provider.as_ref(),
            &mut self.session,
            &dispatcher,
            stream_final,
            interrupted,
            observer,
        )
        .await
    }
}
