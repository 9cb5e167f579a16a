//! Ecosystem extractors and the contract they share.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::Result;
use crate::graph::entity_graph::EntityGraph;

pub mod docker;
pub mod golang;
pub mod kubernetes;
pub mod laravel;
pub mod nextjs;
pub mod pattern;
pub mod sql;
pub mod swagger;

/// Trait that every ecosystem extractor implements.
pub trait Extractor {
    /// Typed intermediate representation produced by a scan.
    type Output: Serialize;

    /// Short ecosystem name used in logs and progress labels (e.g. "docker").
    fn name(&self) -> &'static str;

    /// Scan the sources and build the IR.
    fn extract(&mut self) -> Result<Self::Output>;

    /// Lower the IR into entities and inferred relations.
    fn build_graph(output: &Self::Output) -> EntityGraph;
}

/// Last path component of a project root, used as its display name.
pub fn project_name(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Directory names never descended into by the project scanners.
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "dist",
    "build",
    "target",
    ".next",
    ".idea",
    ".vscode",
];

/// Every regular file under `root` in sorted order, skipping excluded and hidden directories.
pub(crate) fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !DEFAULT_EXCLUDES.iter().any(|p| name == *p) && !name.starts_with('.')
        })
    {
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(_) => {}
            Err(e) => log::warn!("cannot read directory entry: {}", e),
        }
    }
    files
}

/// `path` relative to `root` with forward slashes.
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Read a file as UTF-8, replacing invalid sequences.
pub(crate) fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_uses_last_component() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join("shop-api");
        std::fs::create_dir(&project).unwrap();
        assert_eq!(project_name(&project), "shop-api");
    }

    #[test]
    fn walk_skips_excluded_and_hidden_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        for rel in ["b.txt", "a/x.txt", "node_modules/m.js", ".cache/c.txt", "vendor/v.php"] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        let found: Vec<String> = walk_files(root)
            .iter()
            .map(|p| relative_path(root, p))
            .collect();
        assert_eq!(found, vec!["a/x.txt".to_string(), "b.txt".to_string()]);
    }
}
