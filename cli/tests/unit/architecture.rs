//! Structural tests for layer boundary enforcement.
//!
//! These tests scan source files so the domain stays pure and services only
//! reach I/O through ports.

use std::path::{Path, PathBuf};

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

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

/// Non-comment lines outside `#[cfg(test)]` blocks, with 1-based line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut depth = 0i32;
    let mut test_depth: Option<i32> = None;
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") && test_depth.is_none() {
            test_depth = Some(depth);
        }
        let in_test = test_depth.is_some();
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if test_depth.is_some_and(|d| depth <= d) {
                        test_depth = None;
                    }
                }
                _ => {}
            }
        }
        // `#[cfg(test)] mod tests;` declares an out-of-line module.
        if trimmed.ends_with(';') && test_depth == Some(depth) && trimmed.starts_with("mod ") {
            test_depth = None;
        }
        if !in_test && !trimmed.starts_with("//") && !trimmed.is_empty() {
            out.push((i + 1, line.to_string()));
        }
    }
    out
}

fn violations(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for file in collect_rs_files(dir) {
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
fn domain_has_no_io_or_outer_layer_imports() {
    let found = violations(
        &src_dir().join("domain"),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
        ],
    );
    assert!(found.is_empty(), "domain must stay pure:\n{}", found.join("\n"));
}

#[test]
fn services_reach_io_only_through_ports() {
    let found = violations(
        &src_dir().join("application"),
        &["crate::infra", "crate::output", "crate::commands", "std::fs"],
    );
    assert!(found.is_empty(), "application imports outer layers:\n{}", found.join("\n"));
}

#[test]
fn infra_never_imports_presentation() {
    let found = violations(&src_dir().join("infra"), &["crate::output", "crate::commands"]);
    assert!(found.is_empty(), "infra imports presentation:\n{}", found.join("\n"));
}

#[test]
fn no_concrete_infra_types_in_service_signatures() {
    let concrete = ["StateManager", "LocalEngine", "YamlConfigStore", "FileTemplateStore"];
    let mut found = Vec::new();
    for file in collect_rs_files(&src_dir().join("application")) {
        for (lineno, line) in production_lines(&file) {
            if !line.contains("fn ") {
                continue;
            }
            for ty in &concrete {
                if line.contains(ty) {
                    found.push(format!("{}:{lineno}: {}", file.display(), line.trim()));
                }
            }
        }
    }
    assert!(found.is_empty(), "use port trait bounds instead:\n{}", found.join("\n"));
}

#[test]
fn no_inline_json_branching_in_commands() {
    let mut found = Vec::new();
    for file in collect_rs_files(&src_dir().join("commands")) {
        for (lineno, line) in production_lines(&file) {
            let trimmed = line.trim();
            if line.contains("json: bool")
                || trimmed.starts_with("if json")
                || trimmed.starts_with("if !json")
                || line.contains("serde_json::")
            {
                found.push(format!("{}:{lineno}: {trimmed}", file.display()));
            }
        }
    }
    assert!(
        found.is_empty(),
        "render through app.renderer() instead:\n{}",
        found.join("\n")
    );
}

#[test]
fn production_lines_skips_test_modules() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("x.rs");
    std::fs::write(
        &path,
        "use a;\n// comment\n#[cfg(test)]\nmod tests {\n    use tokio;\n}\nfn b() {}\n",
    )
    .expect("write");
    let lines: Vec<String> = production_lines(&path).into_iter().map(|(_, l)| l).collect();
    assert_eq!(lines, ["use a;", "fn b() {}"]);
}
