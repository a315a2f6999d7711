use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{FlowdocError, Result};

/// Directory names never descended into
const DEFAULT_EXCLUDES: &[&str] = &[
    "__pycache__",
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "venv",
    "env",
    ".env",
    ".tox",
    ".nox",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    "node_modules",
    "tests",
    "test",
];

/// Check if a file is a test file by naming convention
pub fn is_test_file(path: &Path) -> bool {
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem,
        None => return false,
    };
    stem.starts_with("test_") || stem.ends_with("_test") || stem == "conftest"
}

fn is_excluded_dir(name: &str, extra: &[String]) -> bool {
    name.starts_with('.')
        || DEFAULT_EXCLUDES.contains(&name)
        || extra.iter().any(|pattern| pattern == name)
}

/// Recursively discover Python files under a root path
///
/// Results are sorted so downstream output is reproducible across runs.
/// Common non-source directories (venvs, caches, test directories) and
/// test-named files are skipped, plus any configured exclusion patterns.
///
/// An invalid or unreadable root is fatal; everything downstream tolerates
/// failure only at file granularity.
pub fn discover_python_files(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(FlowdocError::Discovery(format!(
            "Path does not exist: {}",
            root.display()
        )));
    }

    if root.is_file() {
        if root.extension().and_then(|e| e.to_str()) == Some("py") {
            return Ok(vec![root.to_path_buf()]);
        }
        return Err(FlowdocError::Discovery(format!(
            "Not a Python file: {}",
            root.display()
        )));
    }

    if !root.is_dir() {
        return Err(FlowdocError::Discovery(format!(
            "Not a file or directory: {}",
            root.display()
        )));
    }

    let extra: Vec<String> = exclude.to_vec();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !is_excluded_dir(&name, &extra)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| FlowdocError::Discovery(e.to_string()))?;
        let path = entry.path();
        if path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("py")
            && !is_test_file(path)
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}
