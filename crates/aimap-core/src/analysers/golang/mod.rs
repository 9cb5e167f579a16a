//! Go code-structure extractor built on tree-sitter-go.

pub mod diagram;
pub mod report;
pub mod syntax;

use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::Extractor;
use crate::config::GolangConfig;
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::EntityGraph;
use crate::ignore::IgnoreSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDoc {
    pub directories: Vec<DirectoryDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryDoc {
    pub path: String,
    pub files: Vec<FileDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDoc {
    pub file_name: String,
    pub package: String,
    pub imports: Vec<String>,
    pub interfaces: Vec<InterfaceDoc>,
    pub structs: Vec<StructDoc>,
    pub constants: Vec<ValueDoc>,
    pub variables: Vec<ValueDoc>,
    pub functions: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDoc {
    pub name: String,
    pub doc: String,
    pub file: String,
    pub line: usize,
    pub methods: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructDoc {
    pub name: String,
    pub doc: String,
    pub file: String,
    pub line: usize,
    pub fields: Vec<FieldDoc>,
    pub methods: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub doc: String,
}

/// A constant or variable declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub doc: String,
    pub file: String,
    pub line: usize,
}

/// A free function, a method, or an interface method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    pub doc: String,
    #[serde(rename = "sig")]
    pub signature: String,
    pub file: String,
    pub line: usize,
}

pub struct GoAnalyser {
    paths: Vec<String>,
    ignores: IgnoreSet,
}

impl GoAnalyser {
    pub fn new(config: &GolangConfig) -> Self {
        Self {
            paths: config.paths.clone(),
            ignores: IgnoreSet::new(&config.ignores),
        }
    }

    /// Walk every configured root and document each directory holding Go files.
    pub fn analyse(&self) -> Result<ProjectDoc> {
        let mut project = ProjectDoc::default();

        for root in &self.paths {
            if !Path::new(root).exists() {
                return Err(AimapError::PathNotFound(root.into()));
            }

            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    // Ignored directories prune the whole subtree.
                    !(e.file_type().is_dir() && self.ignores.is_match(&e.path().to_string_lossy()))
                });

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!("cannot read directory entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_dir() {
                    continue;
                }

                let dir = entry.path().to_string_lossy().to_string();
                match self.analyse_directory(entry.path()) {
                    Ok(files) if !files.is_empty() => project.directories.push(DirectoryDoc {
                        path: dir,
                        files,
                    }),
                    Ok(_) => {}
                    Err(e) => log::warn!("failed to analyse directory {}: {}", dir, e),
                }
            }
        }

        log::info!(
            "go analysis found {} directories with source files",
            project.directories.len()
        );
        Ok(project)
    }

    /// Document the `.go` files directly inside one directory.
    fn analyse_directory(&self, dir: &Path) -> Result<Vec<FileDoc>> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file || path.extension().map_or(true, |ext| ext != "go") {
                continue;
            }
            let full = path.to_string_lossy().to_string();
            if self.ignores.is_match(&full) {
                continue;
            }

            let source = match std::fs::read(&path) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("failed to read {}: {}", full, e);
                    continue;
                }
            };
            match syntax::parse_file(&source, &full) {
                Ok(doc) => files.push(doc),
                Err(e) => log::warn!("skipping {}: {}", full, e),
            }
        }
        Ok(files)
    }
}

impl Extractor for GoAnalyser {
    type Output = ProjectDoc;

    fn name(&self) -> &'static str {
        "golang"
    }

    fn extract(&mut self) -> Result<ProjectDoc> {
        self.analyse()
    }

    fn build_graph(output: &ProjectDoc) -> EntityGraph {
        diagram::build_graph(output)
    }
}

/// Names starting with a lowercase ASCII letter are package-internal.
pub fn is_internal(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}
