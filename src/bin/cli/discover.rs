//! Source discovery
//!
//! Walks the given roots and collects `.rs` files. Each file becomes one
//! compilation unit.

use super::filters::PathFilter;
use anyhow::Context;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["target", ".git"];

/// Find all Rust sources under `roots`, sorted and without duplicates.
///
/// A root that is a file is taken as is, whatever its extension.
pub fn discover_sources(roots: &[PathBuf], exclude: &PathFilter) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in roots {
        let metadata = std::fs::metadata(root).with_context(|| format!("cannot access {}", root.display()))?;
        if metadata.is_file() {
            if !exclude.matches(root) {
                files.push(root.clone());
            }
            continue;
        }

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
        {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            let path = entry.path();
            if entry.file_type().is_file() && is_rust_source(path) && !exclude.matches(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn is_rust_source(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("rs")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discovery_skips_build_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for file in [
            "src/lib.rs",
            "src/nested/mod.rs",
            "src/notes.md",
            "target/debug/build.rs",
            ".git/hooks/hook.rs",
            ".hidden/x.rs",
        ] {
            touch(root, file);
        }

        let files = discover_sources(&[root.to_path_buf()], &PathFilter::default()).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(relative, vec!["src/lib.rs", "src/nested/mod.rs"]);
    }

    #[test]
    fn test_discovery_applies_excludes_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "keep.rs");
        touch(root, "generated/skip.rs");

        let exclude = PathFilter::new(&["generated".to_string()]).unwrap();
        let roots = vec![root.to_path_buf(), root.join("keep.rs")];
        let files = discover_sources(&roots, &exclude).unwrap();
        assert_eq!(files, vec![root.join("keep.rs")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(discover_sources(&[missing], &PathFilter::default()).is_err());
    }
}
