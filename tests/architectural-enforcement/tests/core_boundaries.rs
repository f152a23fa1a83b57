//! Integration Test: Queue Core Boundaries
//!
//! **Policy**: `popup-core` is headless. It talks to its host only through
//! the collaborator traits, so it MUST NOT depend on a terminal library or an
//! async runtime, and its production code MUST NOT panic on errors.

use std::fs;

use architectural_enforcement::{dependency_names, scan, workspace_root};

const UI_AND_RUNTIME_CRATES: &[&str] = &["ratatui", "crossterm", "tokio", "async-std"];

#[test]
fn test_core_manifest_has_no_ui_or_runtime_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("popup/core/Cargo.toml"))
        .expect("popup/core/Cargo.toml should exist");

    let offending: Vec<String> = dependency_names(&manifest)
        .expect("popup/core/Cargo.toml should parse")
        .into_iter()
        .filter(|name| UI_AND_RUNTIME_CRATES.contains(&name.as_str()))
        .collect();

    assert!(
        offending.is_empty(),
        "popup-core must stay headless; found dependencies: {offending:?}"
    );
}

#[test]
fn test_core_sources_do_not_import_ui_or_runtime() {
    let violations = scan(
        "popup/core/src",
        &["use ratatui", "use crossterm", "use tokio", "tokio::"],
    );

    assert!(
        violations.is_empty(),
        "popup-core imports a UI or runtime crate:\n{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn test_core_production_code_does_not_panic_on_errors() {
    let violations = scan("popup/core/src", &[".unwrap()", ".expect(", "panic!("]);

    assert!(
        violations.is_empty(),
        "popup-core production code must propagate errors:\n{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}
