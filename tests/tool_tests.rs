// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 The Hew Authors

//! Tool dispatcher: fixed registry, argument validation, and the
//! error-containment boundary.

use std::sync::Arc;

use hew::llm::ToolCall;
use hew::tools::ToolDispatcher;
use hew::workspace::Workspace;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn dispatcher(temp: &TempDir) -> ToolDispatcher {
    ToolDispatcher::new(Arc::new(Workspace::open(temp.path()).unwrap()))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

#[test]
fn test_registry_is_fixed_at_six_tools() {
    let names: Vec<String> = ToolDispatcher::definitions()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(
        names,
        [
            "list_files",
            "read_file",
            "write_file",
            "create_directory",
            "delete_file",
            "apply_file_edit",
        ]
    );
}

#[test]
fn test_unknown_tool_never_touches_the_filesystem() {
    let temp = TempDir::new().unwrap();
    let result = dispatcher(&temp).dispatch("rm_rf", &args(json!({ "path": "x" })));
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("Unknown tool"));
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[test]
fn test_argument_mismatch_is_a_result_not_a_panic() {
    let temp = TempDir::new().unwrap();
    let dispatcher = dispatcher(&temp);

    let missing = dispatcher.dispatch("write_file", &args(json!({ "path": "a.txt" })));
    assert_eq!(missing["success"], false);
    assert!(missing["error"].as_str().unwrap().contains("content"));

    let extra = dispatcher.dispatch(
        "delete_file",
        &args(json!({ "path": "a.txt", "force": true })),
    );
    assert_eq!(extra["success"], false);
    assert!(extra["error"].as_str().unwrap().contains("unexpected argument"));
}

#[test]
fn test_list_files_defaults_missing_path() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("visible.txt"), "x").unwrap();
    std::fs::create_dir(temp.path().join("dir")).unwrap();

    let result = dispatcher(&temp).dispatch("list_files", &Map::new());
    assert_eq!(result["success"], true);
    let files: Vec<&str> = result["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(files, ["dir/", "visible.txt"]);
}

#[test]
fn test_full_file_lifecycle_through_dispatch() {
    let temp = TempDir::new().unwrap();
    let dispatcher = dispatcher(&temp);

    assert_eq!(
        dispatcher.dispatch(
            "create_directory",
            &args(json!({ "path": "src" }))
        )["success"],
        true
    );
    assert_eq!(
        dispatcher.dispatch(
            "write_file",
            &args(json!({ "path": "src/lib.rs", "content": "fn one() {}\n" }))
        )["success"],
        true
    );
    assert_eq!(
        dispatcher.dispatch(
            "apply_file_edit",
            &args(json!({
                "path": "src/lib.rs",
                "search_block": "fn one() {}",
                "replace_block": "fn two() {}"
            }))
        )["success"],
        true
    );

    let read = dispatcher.dispatch("read_file", &args(json!({ "path": "src/lib.rs" })));
    assert_eq!(read["content"], "fn two() {}\n");

    assert_eq!(
        dispatcher.dispatch("delete_file", &args(json!({ "path": "src/lib.rs" })))["success"],
        true
    );
}

#[test]
fn test_workspace_errors_are_contained_as_results() {
    let temp = TempDir::new().unwrap();
    let dispatcher = dispatcher(&temp);

    let escape = dispatcher.dispatch("read_file", &args(json!({ "path": "../../etc/shadow" })));
    assert_eq!(escape["success"], false);
    assert!(escape["error"].as_str().unwrap().contains("outside the workspace"));

    let missing = dispatcher.dispatch("read_file", &args(json!({ "path": "ghost.txt" })));
    assert_eq!(missing["success"], false);
    assert!(missing["error"].as_str().unwrap().contains("File not found"));
}

#[test]
fn test_patch_ambiguity_surfaces_verbatim_to_the_model() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), "x\nx").unwrap();

    let result = dispatcher(&temp).dispatch(
        "apply_file_edit",
        &args(json!({ "path": "f.txt", "search_block": "x", "replace_block": "y" })),
    );
    assert_eq!(result["success"], false);
    let error = result["error"].as_str().unwrap();
    assert!(error.contains("Ambiguous match"));
    assert!(error.contains("unique"));
}

#[test]
fn test_dispatch_call_recovers_from_malformed_arguments() {
    let temp = TempDir::new().unwrap();
    let call = ToolCall::new(Some("call_0".into()), "write_file", "not json at all");
    let result = dispatcher(&temp).dispatch_call(&call);
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("Invalid JSON"));
}
