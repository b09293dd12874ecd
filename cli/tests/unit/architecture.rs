//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra → commands/output) are kept.

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

fn src_dir(layer: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(layer)
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
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
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
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

/// Non-comment lines outside `#[cfg(test)]`, with their 1-based line numbers.
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
            !in_test
                && !trimmed.starts_with("//")
                && !trimmed.starts_with("/*")
                && !trimmed.starts_with('*')
        })
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

/// Count non-test, non-comment, non-empty lines in a file.
fn count_non_test_lines(path: &Path) -> usize {
    production_lines(path)
        .iter()
        .filter(|(_, line)| !line.trim().is_empty())
        .count()
}

/// Flag every production line in `dir` containing one of `forbidden`.
fn scan_for(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            for pattern in forbidden {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{lineno}: `{pattern}`: {}", line.trim()));
                }
            }
        }
    }
    violations
}

// ── Property 1: Domain purity ─────────────────────────────────────────────────

#[test]
fn domain_has_no_io_or_outer_layer_imports() {
    let violations = scan_for(
        &src_dir("domain"),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "println!",
        ],
    );

    assert!(
        violations.is_empty(),
        "domain/ must stay pure (no I/O, no outer layers):\n{}",
        violations.join("\n")
    );
}

// ── Property 2: Application depends only on domain and ports ──────────────────

#[test]
fn application_has_no_infra_or_presentation_imports() {
    let violations = scan_for(
        &src_dir("application"),
        &["crate::infra", "crate::commands", "crate::output", "println!"],
    );

    assert!(
        violations.is_empty(),
        "application/ must only import from domain/ and ports:\n{}",
        violations.join("\n")
    );
}

// ── Property 3: Infra never reaches up ────────────────────────────────────────

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = scan_for(&src_dir("infra"), &["crate::commands", "crate::output"]);

    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = scan_for(&src_dir("infra"), &["println!", "eprintln!"]);

    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

// ── Property 5: Trait bounds over concrete types ──────────────────────────────

#[test]
fn no_concrete_infra_types_in_service_signatures() {
    let concrete_types = [
        "LocalFs",
        "TokioCommandRunner",
        "YamlConfigStore",
        "TeraTemplateStore",
        "AwsCliZoneDiscovery",
        "SshKeygen",
        "CliResolver",
    ];

    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&src_dir("application")) {
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            if !line.contains("fn ") {
                continue;
            }
            for concrete in &concrete_types {
                if line.contains(concrete) {
                    violations.push(format!(
                        "{rel}:{lineno}: concrete type `{concrete}` in function signature: {line}"
                    ));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found concrete infra types in service signatures - use port trait bounds instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_tokio_command_runner_construction_outside_app() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");

    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&src) {
        let rel = relative(&file);
        if rel.contains("/infra/") || rel.ends_with("app.rs") {
            continue;
        }
        for (lineno, line) in production_lines(&file) {
            if line.contains("TokioCommandRunner::new") || line.contains("TokioCommandRunner::default")
            {
                violations.push(format!("{rel}:{lineno}: {}", line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "The process runner is built once in AppContext and shared:\n{}",
        violations.join("\n")
    );
}

// ── Property 8: Command handlers accept unified AppContext ────────────────────

#[test]
fn command_handlers_accept_app_context() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir("commands")) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let has_run = content.contains("pub async fn run(") || content.contains("pub fn run(");
        if !has_run {
            continue;
        }
        let has_app_context = content.contains("app: &AppContext")
            || content.contains("app: &crate::app::AppContext");
        if !has_app_context {
            violations.push(format!(
                "{}: run() does not accept &AppContext",
                relative(&file)
            ));
        }
    }

    assert!(
        violations.is_empty(),
        "Command handlers must accept &AppContext:\n{}",
        violations.join("\n")
    );
}

// ── Property 10: No inline JSON branching ─────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir("commands")) {
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            if line.contains("json: bool") {
                violations.push(format!(
                    "{rel}:{lineno}: found `json: bool` parameter: {line}"
                ));
            }
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                violations.push(format!("{rel}:{lineno}: found inline JSON branch: {line}"));
            }
            if line.contains("serde_json::to_string") {
                violations.push(format!("{rel}:{lineno}: serializing in a command: {line}"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found inline JSON handling in commands/ - use app.renderer() instead:\n{}",
        violations.join("\n")
    );
}

// ── Property 11: Command handler size limits ──────────────────────────────────

#[test]
fn command_handlers_are_reasonably_sized() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir("commands")) {
        let line_count = count_non_test_lines(&file);
        if line_count > 125 {
            violations.push(format!(
                "{}: {line_count} non-test lines (limit: 125)",
                relative(&file)
            ));
        }
    }

    assert!(
        violations.is_empty(),
        "Command handler files exceed 125-line limit - extract logic to application services:\n{}",
        violations.join("\n")
    );
}

// ── Property 14: Blocking I/O safety ─────────────────────────────────────────

/// Track whether a line is inside an async fn and outside `spawn_blocking`.
struct AsyncContextTracker {
    in_async_fn: bool,
    in_spawn_blocking: bool,
    brace_depth: i32,
    async_fn_start_depth: i32,
    spawn_blocking_start_depth: i32,
}

impl AsyncContextTracker {
    fn new() -> Self {
        Self {
            in_async_fn: false,
            in_spawn_blocking: false,
            brace_depth: 0,
            async_fn_start_depth: 0,
            spawn_blocking_start_depth: 0,
        }
    }

    /// Process a line. Returns `true` if the line is in an async fn but NOT in `spawn_blocking`.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("async fn ") && !trimmed.starts_with("//") {
            self.in_async_fn = true;
            self.async_fn_start_depth = self.brace_depth;
        } else if trimmed.contains("fn ") && !trimmed.contains("async ") && !trimmed.starts_with("//")
        {
            self.in_async_fn = false;
            self.in_spawn_blocking = false;
        }
        if self.in_async_fn && line.contains("spawn_blocking") {
            self.in_spawn_blocking = true;
            self.spawn_blocking_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_spawn_blocking && self.brace_depth <= self.spawn_blocking_start_depth
                    {
                        self.in_spawn_blocking = false;
                    }
                    if self.in_async_fn && self.brace_depth <= self.async_fn_start_depth {
                        self.in_async_fn = false;
                    }
                }
                _ => {}
            }
        }
        self.in_async_fn && !self.in_spawn_blocking
    }
}

fn blocking_calls_in_async(dir: &Path, deny_list: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = relative(&file);
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut async_tracker = AsyncContextTracker::new();
        let mut test_tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = test_tracker.process_line(line);
            let in_unguarded_async = async_tracker.process_line(line);
            if in_test || !in_unguarded_async || line.trim().starts_with("//") {
                continue;
            }
            for pattern in deny_list {
                if line.contains(pattern) {
                    violations.push(format!("{rel}:{}: `{pattern}` in async fn: {line}", i + 1));
                }
            }
        }
    }
    violations
}

#[test]
fn infra_async_functions_do_not_use_blocking_fs() {
    let violations = blocking_calls_in_async(&src_dir("infra"), &["std::fs::"]);

    assert!(
        violations.is_empty(),
        "infra/ async functions must not use blocking std::fs outside spawn_blocking:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_blocking_io() {
    let violations = blocking_calls_in_async(
        &src_dir("application"),
        &["std::fs::", "std::process::Command", "std::net::TcpStream"],
    );

    assert!(
        violations.is_empty(),
        "Found blocking I/O calls in async functions in application/ layer:\n{}",
        violations.join("\n")
    );
}

/// No module-level #![`allow(dead_code)`] in domain/, application/, or infra/ layers.
#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let mut violations: Vec<String> = Vec::new();

    for layer in ["domain", "application", "infra"] {
        for file in collect_rs_files(&src_dir(layer)) {
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            for (i, line) in content.lines().enumerate() {
                if line.trim() == "#![allow(dead_code)]" {
                    violations.push(format!("{}:{}", relative(&file), i + 1));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Module-level #![allow(dead_code)] found in architecture layers - use item-level suppression:\n{}",
        violations.join("\n")
    );
}
