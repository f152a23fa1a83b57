//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - Prompt drivers wait on the frame scheduler, never on a timer thread
//! - The queue core stays free of terminal and async-runtime dependencies
//! - Production code propagates errors instead of panicking
//!
//! The helpers here walk the workspace sources; the checks live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root (two levels above this package)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the match
    pub path: PathBuf,
    /// One-based line number
    pub line: usize,
    /// Offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Production lines of a source file: comments stripped, and everything from
/// the first `#[cfg(test)]` on dropped
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .collect()
}

/// Scan every `.rs` file under `dir` (relative to the workspace root) for
/// production lines containing any of `patterns`
pub fn scan(dir: &str, patterns: &[&str]) -> Vec<Violation> {
    let path = workspace_root().join(dir);
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(&path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };
        for (line, code) in production_lines(&content) {
            if patterns.iter().any(|p| code.contains(p)) {
                violations.push(Violation {
                    path: entry.path().to_path_buf(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }

    violations
}

/// Crates a manifest links into its build, sorted and deduplicated
///
/// Covers `[dependencies]` and every `[target.*.dependencies]` table. A
/// renamed dependency reports both its key and its `package`.
pub fn dependency_names(manifest: &str) -> Result<Vec<String>, toml::de::Error> {
    let manifest: toml::Table = toml::from_str(manifest)?;

    let mut tables: Vec<&toml::Table> = Vec::new();
    if let Some(deps) = manifest.get("dependencies").and_then(toml::Value::as_table) {
        tables.push(deps);
    }
    if let Some(targets) = manifest.get("target").and_then(toml::Value::as_table) {
        tables.extend(
            targets
                .values()
                .filter_map(|t| t.get("dependencies"))
                .filter_map(toml::Value::as_table),
        );
    }

    let mut names: Vec<String> = Vec::new();
    for (name, spec) in tables.into_iter().flatten() {
        names.push(name.clone());
        if let Some(package) = spec.get("package").and_then(toml::Value::as_str) {
            names.push(package.to_string());
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let src = "fn a() {} // sleep(1)\n#[cfg(test)]\nmod tests { fn b() { sleep(1) } }\n";
        let lines = production_lines(src);
        assert_eq!(lines, vec![(1, "fn a() {} ")]);
    }

    #[test]
    fn test_dependency_names() {
        let manifest = "[package]\nname = \"x\"\n\n[dependencies]\n# comment\nfoo = \"1\"\nbar = { version = \"2\" }\n\n[dev-dependencies]\nbaz = \"3\"\n";
        assert_eq!(dependency_names(manifest).unwrap(), vec!["bar", "foo"]);
    }

    #[test]
    fn test_dependency_names_see_dotted_and_target_tables() {
        let manifest = r#"
[package]
name = "x"

[dependencies.tokio]
version = "1"

[target.'cfg(unix)'.dependencies]
ratatui = "0.29"

[target.'cfg(windows)'.dev-dependencies]
crossterm = "0.28"
"#;
        assert_eq!(dependency_names(manifest).unwrap(), vec!["ratatui", "tokio"]);
    }

    #[test]
    fn test_renamed_dependency_reports_package() {
        let manifest = "[dependencies]\nrt = { package = \"tokio\", version = \"1\" }\n";
        assert_eq!(dependency_names(manifest).unwrap(), vec!["rt", "tokio"]);
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        assert!(dependency_names("[dependencies\nfoo = ").is_err());
    }
}
