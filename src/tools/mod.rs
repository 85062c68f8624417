// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Tool system for Hew
//!
//! A fixed registry of six workspace operations and the dispatch
//! boundary that the orchestration loop calls into. No failure crosses
//! this boundary as an error value: everything becomes a structured
//! `{success, ...}` result the model can read.

pub mod definition;
pub mod dispatcher;

pub use definition::SchemaBuilder;
pub use dispatcher::ToolDispatcher;
