//! Shared test helpers for integration tests.

use std::path::{Path, PathBuf};

use aimap_core::graph::entity_graph::{EntityGraph, Relation, RelationKind};

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

/// Same as [`fixture_path`], as the string form configuration expects.
pub fn fixture_str(name: &str) -> String {
    fixture_path(name).to_string_lossy().to_string()
}

// ---------------------------------------------------------------------------
// Scratch projects
// ---------------------------------------------------------------------------

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

// ---------------------------------------------------------------------------
// Graph queries
// ---------------------------------------------------------------------------

/// `(from, to)` names of every relation of one kind, in insertion order.
pub fn pairs(graph: &EntityGraph, kind: RelationKind) -> Vec<(String, String)> {
    graph
        .relations_of_kind(kind)
        .into_iter()
        .map(|r| (r.from.name, r.to.name))
        .collect()
}

/// Find the relation between two named entities.
pub fn find_relation<'a>(relations: &'a [Relation], from: &str, to: &str) -> Option<&'a Relation> {
    relations
        .iter()
        .find(|r| r.from.name == from && r.to.name == to)
}
