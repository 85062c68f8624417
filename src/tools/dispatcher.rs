// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Tool dispatch boundary
//!
//! Maps a tool name and argument mapping onto the corresponding
//! workspace operation. This is the error-containment boundary for the
//! whole tool surface: unknown names, argument mismatches, and every
//! underlying workspace failure come back as `{success:false, error}`
//! results, never as propagated errors.
//!
//! Dispatch is synchronous on purpose. The only await points in a turn
//! are model calls, so cancelling a turn can never leave a tool batch
//! half-applied.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::llm::message::ToolCall;
use crate::llm::provider::ToolDefinition;
use crate::workspace::Workspace;

use super::SchemaBuilder;

/// Dispatcher over the fixed tool registry.
pub struct ToolDispatcher {
    workspace: Arc<Workspace>,
}

impl ToolDispatcher {
    /// Create a dispatcher for a workspace.
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Definitions of the six registered tools, advertised to the model.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "list_files".to_string(),
                description:
                    "Lists files and directories at a given path within the workspace."
                        .to_string(),
                input_schema: SchemaBuilder::new()
                    .string(
                        "path",
                        "The relative path from the workspace root. Defaults to '.'.",
                        false,
                    )
                    .build(),
            },
            ToolDefinition {
                name: "read_file".to_string(),
                description: "Reads the full content of a file within the workspace.".to_string(),
                input_schema: SchemaBuilder::new()
                    .string("path", "The relative path to the file.", true)
                    .build(),
            },
            ToolDefinition {
                name: "write_file".to_string(),
                description: "Writes or overwrites an ENTIRE file with new content. WARNING: \
                              Do not use for small edits; use apply_file_edit instead."
                    .to_string(),
                input_schema: SchemaBuilder::new()
                    .string("path", "The relative path to the file.", true)
                    .string("content", "The full content to write to the file.", true)
                    .build(),
            },
            ToolDefinition {
                name: "create_directory".to_string(),
                description: "Creates a new directory (and any parent directories).".to_string(),
                input_schema: SchemaBuilder::new()
                    .string("path", "The relative path for the new directory.", true)
                    .build(),
            },
            ToolDefinition {
                name: "delete_file".to_string(),
                description: "Deletes a file.".to_string(),
                input_schema: SchemaBuilder::new()
                    .string("path", "The relative path of the file to delete.", true)
                    .build(),
            },
            ToolDefinition {
                name: "apply_file_edit".to_string(),
                description:
                    "Applies a precise search-and-replace edit to a file. The search_block must \
                     match existing content exactly (or close enough for fuzzy matching) and be \
                     unique."
                        .to_string(),
                input_schema: SchemaBuilder::new()
                    .string("path", "The relative path to the file to modify.", true)
                    .string(
                        "search_block",
                        "The exact block of code to find. Must be unique in the file.",
                        true,
                    )
                    .string(
                        "replace_block",
                        "The new block of code to insert in place of the search_block.",
                        true,
                    )
                    .build(),
            },
        ]
    }

    /// Dispatch a parsed tool call, converting a malformed argument
    /// encoding into a recoverable failure result.
    pub fn dispatch_call(&self, call: &ToolCall) -> Value {
        match call.parse_arguments() {
            Ok(arguments) => self.dispatch(&call.name, &arguments),
            Err(e) => failure(format!("Invalid JSON in arguments: {e}")),
        }
    }

    /// Dispatch a tool by name with an argument mapping.
    pub fn dispatch(&self, name: &str, arguments: &Map<String, Value>) -> Value {
        tracing::debug!(
            target: "hew::tools",
            tool = %name,
            "dispatching tool call"
        );
        match self.run(name, arguments) {
            Ok(result) => result,
            Err(message) => {
                tracing::debug!(
                    target: "hew::tools",
                    tool = %name,
                    error = %message,
                    "tool call failed"
                );
                failure(message)
            }
        }
    }

    fn run(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, String> {
        let Some(allowed) = allowed_arguments(name) else {
            return Err(format!("Unknown tool: {name}"));
        };
        for key in arguments.keys() {
            if !allowed.contains(&key.as_str()) {
                return Err(format!(
                    "Argument mismatch for {name}: unexpected argument '{key}'"
                ));
            }
        }

        match name {
            "list_files" => {
                let path = optional_string(arguments, "path", name)?
                    .unwrap_or_else(|| ".".to_string());
                let files = self.workspace.list_files(&path).map_err(stringify)?;
                Ok(json!({ "success": true, "files": files }))
            }
            "read_file" => {
                let path = required_string(arguments, "path", name)?;
                let content = self.workspace.read_file(&path).map_err(stringify)?;
                Ok(json!({ "success": true, "content": content }))
            }
            "write_file" => {
                let path = required_string(arguments, "path", name)?;
                let content = required_string(arguments, "content", name)?;
                self.workspace.write_file(&path, &content).map_err(stringify)?;
                Ok(json!({
                    "success": true,
                    "message": format!("File '{path}' written successfully.")
                }))
            }
            "create_directory" => {
                let path = required_string(arguments, "path", name)?;
                self.workspace.create_directory(&path).map_err(stringify)?;
                Ok(json!({
                    "success": true,
                    "message": format!("Directory '{path}' created successfully.")
                }))
            }
            "delete_file" => {
                let path = required_string(arguments, "path", name)?;
                self.workspace.delete_file(&path).map_err(stringify)?;
                Ok(json!({
                    "success": true,
                    "message": format!("File '{path}' deleted successfully.")
                }))
            }
            "apply_file_edit" => {
                let path = required_string(arguments, "path", name)?;
                let search_block = required_string(arguments, "search_block", name)?;
                let replace_block = required_string(arguments, "replace_block", name)?;
                let applied = self
                    .workspace
                    .apply_edit(&path, &search_block, &replace_block)
                    .map_err(stringify)?;
                Ok(json!({ "success": true, "message": applied.message() }))
            }
            _ => Err(format!("Unknown tool: {name}")),
        }
    }
}

/// The accepted argument names per tool, or `None` for an unknown tool.
fn allowed_arguments(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "list_files" | "read_file" | "create_directory" | "delete_file" => Some(&["path"]),
        "write_file" => Some(&["path", "content"]),
        "apply_file_edit" => Some(&["path", "search_block", "replace_block"]),
        _ => None,
    }
}

fn required_string(
    arguments: &Map<String, Value>,
    key: &str,
    tool: &str,
) -> Result<String, String> {
    match arguments.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(format!(
            "Argument mismatch for {tool}: argument '{key}' must be a string"
        )),
        None => Err(format!(
            "Argument mismatch for {tool}: missing required argument '{key}'"
        )),
    }
}

fn optional_string(
    arguments: &Map<String, Value>,
    key: &str,
    tool: &str,
) -> Result<Option<String>, String> {
    match arguments.get(key) {
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(format!(
            "Argument mismatch for {tool}: argument '{key}' must be a string"
        )),
        None => Ok(None),
    }
}

fn stringify(error: crate::error::WorkspaceError) -> String {
    error.to_string()
}

fn failure(message: String) -> Value {
    json!({ "success": false, "error": message })
}
