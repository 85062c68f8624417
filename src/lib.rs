// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Hew - autonomous AI coding agent for the terminal.
//!
//! This crate exposes the shared runtime used by the `hew` CLI
//! (`src/main.rs`):
//! - `workspace`: sandboxed path resolution, file operations, and the
//!   exact/fuzzy text-patch engine
//! - `tools`: the fixed tool registry and the dispatch boundary that
//!   converts every failure into a structured result
//! - `llm`: provider abstraction and the two wire-format families
//!   (OpenAI-compatible and Gemini)
//! - `chat`: session state, slash commands, and the bounded agent loop
//! - `config`: on-disk settings with per-provider entries

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;
pub mod workspace;

pub use error::{HewError, Result};
