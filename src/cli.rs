// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

/// Autonomous AI coding agent for the terminal
#[derive(Debug, Parser)]
#[command(name = "hew", version, about)]
pub struct HewArgs {
    /// Workspace directory to sandbox file operations to
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Provider to use for this run (overrides the configured default)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Path to the settings file (default: ~/.hew/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable payload debug logging
    #[arg(long)]
    pub debug: bool,

    /// Run a single prompt non-interactively and exit
    #[arg(long)]
    pub prompt: Option<String>,
}
