// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Slash commands
//!
//! Parses and executes the `/`-prefixed commands, returning structured
//! outcomes the REPL renders. Command handlers mutate the [`Agent`]
//! directly; only `/load` and `/verify` do real work.

use std::path::Path;

use crate::error::Result;
use crate::workspace::scan;

use super::Agent;

/// Threshold above which a `/load` result carries a cost warning.
const LOAD_WARNING_BYTES: usize = 150_000;

/// Outcome of a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// Print a message and continue
    Reply(String),
    /// Print an error and continue
    Error(String),
    /// Exit the application
    Exit,
}

const HELP_TEXT: &str = "\
--- Help & Commands ---
/help              : Show this help message.
/new               : Start a new conversation.
/exit              : Exit the application.
/status            : Show current configuration status.
/workspace <path>  : Set or show the workspace directory.
/load              : Load all text files from the workspace into context for the next turn.
/clear             : Clear loaded file context.
/providers         : List all configured providers.
/provider <name>   : Switch the active API provider.
/model <name>      : Set the model for the active provider.
/api <key>         : Set the API key for the active provider.
/verify            : Test the connection to the current provider.
/debug             : Toggle payload debug logging for the next start.";

/// Parse and execute a slash command.
pub async fn handle_command(agent: &mut Agent, input: &str) -> Result<CommandAction> {
    let mut parts = input.trim().split_whitespace();
    let command = parts.next().unwrap_or("").to_lowercase();
    let rest: Vec<&str> = parts.collect();

    let action = match command.as_str() {
        "/help" => CommandAction::Reply(HELP_TEXT.to_string()),
        "/new" => {
            agent.session.reset();
            CommandAction::Reply("New chat session started.".to_string())
        }
        "/exit" => CommandAction::Exit,
        "/status" => CommandAction::Reply(status(agent)),
        "/workspace" => workspace_command(agent, &rest)?,
        "/load" => load_command(agent)?,
        "/clear" => {
            agent.session.clear_pending_context();
            CommandAction::Reply("File context cleared.".to_string())
        }
        "/providers" => CommandAction::Reply(providers_list(agent)),
        "/provider" => provider_command(agent, &rest)?,
        "/model" => model_command(agent, &rest)?,
        "/api" => api_command(agent, &rest)?,
        "/verify" => verify_command(agent).await,
        "/debug" => {
            agent.settings.debug_mode = !agent.settings.debug_mode;
            agent.settings.save_to(&agent.settings_path)?;
            CommandAction::Reply(format!(
                "Debug mode is now {} (payload logging applies from the next start).",
                if agent.settings.debug_mode { "ON" } else { "OFF" }
            ))
        }
        other => CommandAction::Error(format!(
            "Unknown command '{other}'. Type /help for assistance."
        )),
    };
    Ok(action)
}

fn status(agent: &Agent) -> String {
    let workspace = agent
        .workspace
        .as_ref()
        .map(|w| w.root().display().to_string())
        .unwrap_or_else(|| "Not set".to_string());
    let provider = &agent.settings.active_provider;
    let (model, key) = agent
        .settings
        .active()
        .map(|p| (p.model.clone(), mask_key(&p.api_key)))
        .unwrap_or_else(|| ("unknown".to_string(), "Not set".to_string()));
    let context = agent
        .session
        .pending_context_len()
        .map(|len| format!("{len} bytes staged"))
        .unwrap_or_else(|| "None".to_string());

    format!(
        "--- Current Status ---\n\
         Workspace:      {workspace}\n\
         Provider:       {provider}\n\
         Model:          {model}\n\
         API key:        {key}\n\
         Loaded context: {context}\n\
         Messages:       {}",
        agent.session.len()
    )
}

fn mask_key(key: &str) -> String {
    if key.is_empty() || key.contains("YOUR_") {
        "Not set".to_string()
    } else if key.len() > 9 {
        format!("{}...{}", &key[..5], &key[key.len() - 4..])
    } else {
        "Set".to_string()
    }
}

fn workspace_command(agent: &mut Agent, rest: &[&str]) -> Result<CommandAction> {
    if rest.is_empty() {
        let current = agent
            .workspace
            .as_ref()
            .map(|w| w.root().display().to_string())
            .unwrap_or_else(|| "Not set".to_string());
        return Ok(CommandAction::Reply(format!("Current workspace: {current}")));
    }

    let path = rest.join(" ");
    if !Path::new(&path).is_dir() {
        return Ok(CommandAction::Error(format!(
            "Directory not found: '{path}'"
        )));
    }
    agent.set_workspace(Path::new(&path))?;
    let root = agent
        .workspace
        .as_ref()
        .map(|w| w.root().display().to_string())
        .unwrap_or_default();
    Ok(CommandAction::Reply(format!(
        "Workspace set to: {root} (new session started)"
    )))
}

fn load_command(agent: &mut Agent) -> Result<CommandAction> {
    let Some(workspace) = agent.workspace.clone() else {
        return Ok(CommandAction::Error(
            "Workspace not set. Use /workspace <path>.".to_string(),
        ));
    };

    let loaded = match scan::load_context(&workspace) {
        Ok(loaded) => loaded,
        Err(e) => return Ok(CommandAction::Error(e.to_string())),
    };
    if loaded.file_count == 0 {
        return Ok(CommandAction::Reply(
            "No text files found in workspace.".to_string(),
        ));
    }

    let mut message = format!(
        "Loaded {} text files ({} bytes). {} binary files were skipped. \
         The content will be injected into your next prompt.",
        loaded.file_count, loaded.byte_count, loaded.skipped_binaries
    );
    if loaded.byte_count > LOAD_WARNING_BYTES {
        message.push_str("\nWarning: large context; this may incur high costs and latency.");
    }
    agent.session.set_pending_context(loaded.blob);
    Ok(CommandAction::Reply(message))
}

fn providers_list(agent: &Agent) -> String {
    let mut lines = vec!["Available providers:".to_string()];
    for name in agent.settings.provider_names() {
        if name == agent.settings.active_provider {
            lines.push(format!("  - {name} (active)"));
        } else {
            lines.push(format!("  - {name}"));
        }
    }
    lines.join("\n")
}

fn provider_command(agent: &mut Agent, rest: &[&str]) -> Result<CommandAction> {
    let Some(name) = rest.first() else {
        return Ok(CommandAction::Error("Usage: /provider <name>".to_string()));
    };
    let name = name.to_lowercase();
    if agent.settings.provider(&name).is_none() {
        return Ok(CommandAction::Error(format!(
            "Provider '{name}' not found. Configured: {}",
            agent.settings.provider_names().join(", ")
        )));
    }
    agent.switch_provider(&name)?;
    let model = agent
        .settings
        .active()
        .map(|p| p.model.clone())
        .unwrap_or_default();
    Ok(CommandAction::Reply(format!(
        "Active provider set to: {name} (model: {model}, new session started)"
    )))
}

fn model_command(agent: &mut Agent, rest: &[&str]) -> Result<CommandAction> {
    if rest.is_empty() {
        return Ok(CommandAction::Error("Usage: /model <model_name>".to_string()));
    }
    let model = rest.join(" ");
    let active = agent.settings.active_provider.clone();
    match agent.settings.provider_mut(&active) {
        Some(provider) => provider.model = model.clone(),
        None => {
            return Ok(CommandAction::Error(format!(
                "Active provider '{active}' is not configured."
            )))
        }
    }
    agent.settings.save_to(&agent.settings_path)?;
    agent.refresh_provider()?;
    Ok(CommandAction::Reply(format!(
        "Model for '{active}' set to: {model}"
    )))
}

fn api_command(agent: &mut Agent, rest: &[&str]) -> Result<CommandAction> {
    let Some(key) = rest.first() else {
        return Ok(CommandAction::Error("Usage: /api <your_api_key>".to_string()));
    };
    let active = agent.settings.active_provider.clone();
    match agent.settings.provider_mut(&active) {
        Some(provider) => provider.api_key = key.to_string(),
        None => {
            return Ok(CommandAction::Error(format!(
                "Active provider '{active}' is not configured."
            )))
        }
    }
    agent.settings.save_to(&agent.settings_path)?;
    agent.refresh_provider()?;
    Ok(CommandAction::Reply(format!(
        "API key for '{active}' updated."
    )))
}

async fn verify_command(agent: &Agent) -> CommandAction {
    match agent.provider.verify().await {
        Ok(reply) => CommandAction::Reply(format!(
            "Verification successful! Model responded: \"{}\"",
            reply.trim()
        )),
        Err(e) => CommandAction::Error(format!("Verification failed: {e}")),
    }
}
