// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Hew CLI entry point: a plain REPL over the shared agent runtime.

use std::io::{self, Write};
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};
use tracing_subscriber::EnvFilter;

use hew::chat::{handle_command, Agent, CommandAction, TurnObserver, TurnOutcome};
use hew::cli::HewArgs;
use hew::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = HewArgs::parse();

    let settings_path = args.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;

    if args.debug {
        settings.debug_mode = true;
    }
    init_tracing(settings.debug_mode);

    if let Some(workspace) = args.workspace.clone() {
        settings.workspace_path = Some(workspace);
    }
    if let Some(provider) = args.provider.clone() {
        if settings.provider(&provider).is_none() {
            anyhow::bail!(
                "Unknown provider '{provider}'. Configured providers: {}",
                settings.provider_names().join(", ")
            );
        }
        settings.active_provider = provider;
    }

    let mut agent = Agent::new(settings, settings_path)?;

    if let Some(prompt) = args.prompt.clone() {
        return run_once(&mut agent, &prompt).await;
    }

    print_banner(&agent)?;
    repl(&mut agent).await
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "hew=debug" } else { "hew=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_banner(agent: &Agent) -> io::Result<()> {
    print_colored(Color::Magenta, "Hew: autonomous coding agent (tool-calling mode)")?;
    match &agent.workspace {
        Some(workspace) => {
            println!("Workspace: {}", workspace.root().display());
        }
        None => {
            print_colored(
                Color::Yellow,
                "Warning: no workspace set. Use '/workspace <path>'.",
            )?;
        }
    }
    println!("Commands: /help, /status, /load, /verify, /exit");
    Ok(())
}

async fn repl(agent: &mut Agent) -> anyhow::Result<()> {
    loop {
        let label = prompt_label(agent);
        let Some(line) = read_input(&label).await? else {
            // EOF
            println!();
            return Ok(());
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match handle_command(agent, &input).await {
                Ok(CommandAction::Reply(message)) => println!("{message}"),
                Ok(CommandAction::Error(message)) => print_colored(Color::Red, &message)?,
                Ok(CommandAction::Exit) => {
                    println!("Exiting. Goodbye!");
                    return Ok(());
                }
                Err(e) => print_colored(Color::Red, &format!("Command failed: {e}"))?,
            }
            continue;
        }

        run_turn_with_cancel(agent, &input).await?;
    }
}

/// Run one turn, letting Ctrl-C abort it. Tool batches are synchronous,
/// so cancellation only ever lands at a model-call await point and never
/// splits a batch.
async fn run_turn_with_cancel(agent: &mut Agent, input: &str) -> anyhow::Result<()> {
    let interrupted = AtomicBool::new(false);
    let mut observer = CliObserver::default();

    tokio::select! {
        result = agent.run_user_turn(input, true, &interrupted, &mut observer) => {
            render_outcome(result)?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            print_colored(Color::Yellow, "--- Agent execution cancelled by user. ---")?;
        }
    }
    Ok(())
}

async fn run_once(agent: &mut Agent, prompt: &str) -> anyhow::Result<()> {
    let interrupted = AtomicBool::new(false);
    let mut observer = CliObserver::default();
    let result = agent
        .run_user_turn(prompt, false, &interrupted, &mut observer)
        .await;
    let failed = result.is_err();
    render_outcome(result)?;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn render_outcome(result: hew::Result<TurnOutcome>) -> io::Result<()> {
    match result {
        Ok(TurnOutcome::Completed { finished }) => {
            if finished {
                print_colored(Color::Green, "✅ Task completed.")?;
            }
        }
        Ok(TurnOutcome::StepLimit { steps }) => {
            print_colored(
                Color::Red,
                &format!("⚠ Safety limit reached ({steps} steps). Pausing execution."),
            )?;
            println!("Enter a new prompt (e.g. 'continue') to resume.");
        }
        Ok(TurnOutcome::Interrupted) => {
            print_colored(Color::Yellow, "--- Agent execution cancelled by user. ---")?;
        }
        Err(e) => {
            print_colored(Color::Red, &format!("[Turn failed] {e}"))?;
        }
    }
    Ok(())
}

fn prompt_label(agent: &Agent) -> String {
    let workspace = agent
        .workspace
        .as_ref()
        .and_then(|w| w.root().file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "no-workspace".to_string());
    format!("You ({workspace}):")
}

async fn read_input(label: &str) -> anyhow::Result<Option<String>> {
    {
        let mut stdout = io::stdout();
        println!();
        stdout.execute(SetForegroundColor(Color::Green))?;
        print!("{label} ");
        stdout.execute(ResetColor)?;
        stdout.flush()?;
    }
    let line = tokio::task::spawn_blocking(|| {
        let mut buffer = String::new();
        match io::stdin().read_line(&mut buffer) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buffer)),
            Err(e) => Err(e),
        }
    })
    .await??;
    Ok(line)
}

fn print_colored(color: Color, text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(color))?;
    println!("{text}");
    stdout.execute(ResetColor)?;
    Ok(())
}

/// Renders loop progress for the terminal.
#[derive(Default)]
struct CliObserver {
    /// Whether the current reply was already printed as stream deltas
    streamed: bool,
}

impl TurnObserver for CliObserver {
    fn on_step(&mut self, step: usize, max_steps: usize) {
        let _ = print_colored(
            Color::Yellow,
            &format!("🤖 Agent is thinking (step {step}/{max_steps})..."),
        );
    }

    fn on_tool_call(&mut self, name: &str, arguments: &str) {
        let _ = print_colored(
            Color::Cyan,
            &format!("›› Running: {name}({})", truncate(arguments, 120)),
        );
    }

    fn on_tool_result(&mut self, _name: &str, result: &serde_json::Value) {
        let success = result["success"].as_bool().unwrap_or(false);
        let summary = summarize_result(result);
        let _ = print_colored(
            if success { Color::Green } else { Color::Red },
            &format!("   Result: {summary}"),
        );
    }

    fn on_text_delta(&mut self, delta: &str) {
        if !self.streamed {
            self.streamed = true;
            let _ = print_colored(Color::Blue, "🤖 Agent:");
        }
        print!("{delta}");
        let _ = io::stdout().flush();
    }

    fn on_reply(&mut self, text: &str) {
        if self.streamed {
            // Already rendered incrementally.
            println!();
            self.streamed = false;
        } else {
            let _ = print_colored(Color::Blue, &format!("🤖 Agent: {text}"));
        }
    }
}

fn summarize_result(result: &serde_json::Value) -> String {
    if result["success"].as_bool().unwrap_or(false) {
        if let Some(message) = result["message"].as_str() {
            message.to_string()
        } else if let Some(files) = result["files"].as_array() {
            format!("Listed {} entries.", files.len())
        } else if let Some(content) = result["content"].as_str() {
            format!("Read file ({} lines).", content.lines().count())
        } else {
            "Operation successful.".to_string()
        }
    } else {
        result["error"]
            .as_str()
            .unwrap_or("An unknown error occurred.")
            .to_string()
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_len {
        flat
    } else {
        let cut: String = flat.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
