//! Structural tests for layer boundary enforcement.
//!
//! These tests scan source files to verify that the domain, application and
//! infrastructure layers only depend inward.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().starts_with("#[cfg(") && line.contains("test") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment lines outside `#[cfg(test)]` blocks, numbered from 1.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            !in_test && !trimmed.starts_with("//")
        })
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

/// Every production line under `src/<layer>` containing one of `forbidden`.
fn violations(layer: &[&str], forbidden: &[&str]) -> Vec<String> {
    let mut dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    for part in layer {
        dir = dir.join(part);
    }
    let mut found = Vec::new();
    for file in collect_rs_files(&dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (lineno, line) in production_lines(&file) {
            for pattern in forbidden {
                if line.contains(pattern) {
                    found.push(format!("{rel}:{lineno}: `{pattern}` in: {}", line.trim()));
                }
            }
        }
    }
    found
}

#[test]
fn domain_is_pure() {
    let found = violations(
        &["domain"],
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::process",
            "tracing::",
        ],
    );
    assert!(
        found.is_empty(),
        "domain layer must not perform I/O:\n{}",
        found.join("\n")
    );
}

#[test]
fn application_depends_only_on_domain_and_ports() {
    let found = violations(
        &["application"],
        &["crate::infra", "crate::commands", "crate::output", "std::fs"],
    );
    assert!(
        found.is_empty(),
        "application layer reached past its ports:\n{}",
        found.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let found = violations(&["infra"], &["crate::commands", "crate::output"]);
    assert!(
        found.is_empty(),
        "infra must not depend on the presentation layer:\n{}",
        found.join("\n")
    );
}

#[test]
fn core_layers_do_not_print() {
    let mut found = Vec::new();
    for layer in ["domain", "application", "infra"] {
        found.extend(violations(&[layer], &["println!", "eprintln!", "print!("]));
    }
    assert!(
        found.is_empty(),
        "only commands and output may write to the terminal:\n{}",
        found.join("\n")
    );
}

#[test]
fn processes_are_spawned_only_in_infra() {
    let mut found = Vec::new();
    for layer in ["domain", "application", "commands", "output"] {
        found.extend(violations(&[layer], &["Command::new(", "process::Command"]));
    }
    assert!(
        found.is_empty(),
        "spawning belongs behind the Dispatcher port:\n{}",
        found.join("\n")
    );
}
