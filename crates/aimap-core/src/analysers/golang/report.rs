//! Markdown report for Go projects: directory tree plus per-package documentation.

use std::fmt::Write;
use std::path::Path;

use super::{is_internal, FunctionDoc, InterfaceDoc, ProjectDoc, StructDoc, ValueDoc};
use crate::config::{GolangConfig, ReportLevel, ReportOptions};

/// Category of report content gated by level and options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Imports,
    Interfaces,
    Structs,
    Constants,
    Variables,
    Functions,
    InternalFuncs,
    Tests,
    Examples,
}

#[derive(Debug, Default, PartialEq)]
pub struct DirNode {
    pub name: String,
    pub children: Vec<DirNode>,
    pub files: Vec<String>,
}

impl DirNode {
    fn child_mut(&mut self, name: &str) -> &mut DirNode {
        let pos = match self.children.iter().position(|c| c.name == name) {
            Some(pos) => pos,
            None => {
                self.children.push(DirNode {
                    name: name.to_string(),
                    ..Default::default()
                });
                self.children.len() - 1
            }
        };
        &mut self.children[pos]
    }
}

pub struct ReportGenerator<'a> {
    project: &'a ProjectDoc,
    base_path: String,
    level: ReportLevel,
    options: ReportOptions,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(project: &'a ProjectDoc, base_path: &str, config: &GolangConfig) -> Self {
        Self {
            project,
            base_path: base_path.to_string(),
            level: config.level(),
            options: config.report_options.clone(),
        }
    }

    pub fn should_include(&self, content: Content) -> bool {
        let opts = &self.options;
        match self.level {
            ReportLevel::Short => matches!(content, Content::Structs | Content::Interfaces),
            ReportLevel::Standard => match content {
                Content::Imports => opts.show_imports,
                Content::InternalFuncs => opts.show_internal_funcs,
                Content::Tests => opts.show_tests,
                _ => true,
            },
            ReportLevel::Complete => match content {
                Content::Imports => opts.show_imports,
                Content::InternalFuncs => opts.show_internal_funcs,
                Content::Tests => opts.show_tests,
                Content::Examples => opts.show_examples,
                _ => true,
            },
        }
    }

    fn relative(&self, path: &str) -> String {
        match Path::new(path).strip_prefix(&self.base_path) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path.to_string(),
        }
    }

    pub fn directory_tree(&self) -> DirNode {
        let root_name = Path::new(&self.base_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.base_path.clone());
        let mut root = DirNode {
            name: root_name,
            ..Default::default()
        };

        for dir in &self.project.directories {
            let rel = self.relative(&dir.path);
            let mut current = &mut root;
            for part in rel.split('/').filter(|p| !p.is_empty() && *p != ".") {
                current = current.child_mut(part);
            }
            for file in &dir.files {
                current.files.push(file_base_name(&file.file_name));
            }
        }
        root
    }

    pub fn markdown(&self) -> String {
        let mut out = String::from("# Project Documentation\n\n## Project Structure\n\n```\n");
        write_tree(&mut out, &self.directory_tree(), "", true);
        out.push_str("```\n\n");

        for dir in &self.project.directories {
            let _ = writeln!(out, "## Package: {}\n", self.relative(&dir.path));

            for file in &dir.files {
                if file.file_name.ends_with("_test.go") && !self.should_include(Content::Tests) {
                    continue;
                }
                let _ = writeln!(out, "### File: {}\n", file_base_name(&file.file_name));

                if !file.imports.is_empty() && self.should_include(Content::Imports) {
                    out.push_str("#### Imports\n\n");
                    for imp in &file.imports {
                        let _ = writeln!(out, "- `{}`", imp);
                    }
                    out.push('\n');
                }

                if !file.interfaces.is_empty() && self.should_include(Content::Interfaces) {
                    out.push_str("#### Interfaces\n\n");
                    for iface in &file.interfaces {
                        self.write_interface(&mut out, iface);
                    }
                }

                if !file.structs.is_empty() && self.should_include(Content::Structs) {
                    out.push_str("#### Structs\n\n");
                    for st in &file.structs {
                        self.write_struct(&mut out, st);
                    }
                }

                if !file.constants.is_empty() && self.should_include(Content::Constants) {
                    out.push_str("#### Constants\n\n");
                    for c in &file.constants {
                        write_value(&mut out, c);
                    }
                    out.push('\n');
                }

                if !file.variables.is_empty() && self.should_include(Content::Variables) {
                    out.push_str("#### Variables\n\n");
                    for v in &file.variables {
                        write_value(&mut out, v);
                    }
                    out.push('\n');
                }

                let functions: Vec<&FunctionDoc> = file
                    .functions
                    .iter()
                    .filter(|f| self.shows_function(&f.name))
                    .collect();
                if !functions.is_empty() && self.should_include(Content::Functions) {
                    out.push_str("#### Functions\n\n");
                    for f in functions {
                        let _ = writeln!(out, "##### `{}{}`\n", f.name, f.signature);
                        if !f.doc.is_empty() {
                            let _ = writeln!(out, "{}\n", f.doc.trim());
                        }
                    }
                }

                out.push_str("\n---\n\n");
            }
        }
        out
    }

    fn shows_member(&self, name: &str) -> bool {
        !is_internal(name) || self.should_include(Content::InternalFuncs)
    }

    fn shows_function(&self, name: &str) -> bool {
        if name.starts_with("Example") && !self.should_include(Content::Examples) {
            return false;
        }
        self.shows_member(name)
    }

    fn write_interface(&self, out: &mut String, iface: &InterfaceDoc) {
        let _ = writeln!(out, "##### Interface `{}`\n", iface.name);
        if !iface.doc.is_empty() {
            let _ = writeln!(out, "{}\n", iface.doc.trim());
        }
        self.write_methods(out, &iface.methods);
    }

    fn write_struct(&self, out: &mut String, st: &StructDoc) {
        let _ = writeln!(out, "##### Struct `{}`\n", st.name);
        if !st.doc.is_empty() {
            let _ = writeln!(out, "{}\n", st.doc.trim());
        }
        if !st.fields.is_empty() {
            out.push_str("Fields:\n\n");
            for f in st.fields.iter().filter(|f| self.shows_member(&f.name)) {
                let _ = write!(out, "- `{} {}`", f.name, f.field_type);
                if let Some(tag) = &f.tag {
                    let _ = write!(out, " `{}`", tag);
                }
                out.push('\n');
                if !f.doc.is_empty() {
                    let _ = writeln!(out, "  - {}", f.doc.trim());
                }
            }
            out.push('\n');
        }
        self.write_methods(out, &st.methods);
    }

    fn write_methods(&self, out: &mut String, methods: &[FunctionDoc]) {
        if methods.is_empty() {
            return;
        }
        out.push_str("Methods:\n\n");
        for m in methods.iter().filter(|m| self.shows_member(&m.name)) {
            let _ = writeln!(out, "- `{}{}`", m.name, m.signature);
            if !m.doc.is_empty() {
                let _ = writeln!(out, "  - {}", m.doc.trim());
            }
        }
        out.push('\n');
    }
}

fn write_value(out: &mut String, v: &ValueDoc) {
    let _ = writeln!(out, "- `{} {}`", v.name, v.value_type);
    if !v.doc.is_empty() {
        let _ = writeln!(out, "  - {}", v.doc.trim());
    }
}

fn file_base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Draw the tree with box-drawing connectors; files first, then subdirectories.
pub fn write_tree(out: &mut String, node: &DirNode, prefix: &str, is_last: bool) {
    if prefix.is_empty() {
        let _ = writeln!(out, "{}", node.name);
    } else if is_last {
        let _ = writeln!(out, "{}└── {}", prefix, node.name);
    } else {
        let _ = writeln!(out, "{}├── {}", prefix, node.name);
    }

    let child_prefix = if prefix.is_empty() {
        "    ".to_string()
    } else if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    for (i, file) in node.files.iter().enumerate() {
        let last_file = i == node.files.len() - 1 && node.children.is_empty();
        let connector = if last_file { "└── " } else { "├── " };
        let _ = writeln!(out, "{}{}{}", child_prefix, connector, file);
    }

    for (i, child) in node.children.iter().enumerate() {
        write_tree(out, child, &child_prefix, i == node.children.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysers::golang::{DirectoryDoc, FileDoc};
    use pretty_assertions::assert_eq;

    fn func(name: &str) -> FunctionDoc {
        FunctionDoc {
            name: name.into(),
            signature: "()".into(),
            ..Default::default()
        }
    }

    fn project() -> ProjectDoc {
        ProjectDoc {
            directories: vec![
                DirectoryDoc {
                    path: "app/cmd".into(),
                    files: vec![FileDoc {
                        file_name: "app/cmd/main.go".into(),
                        package: "main".into(),
                        imports: vec!["fmt".into()],
                        functions: vec![func("main"), func("Run"), func("ExampleRun")],
                        ..Default::default()
                    }],
                },
                DirectoryDoc {
                    path: "app/pkg/store".into(),
                    files: vec![
                        FileDoc {
                            file_name: "app/pkg/store/store.go".into(),
                            package: "store".into(),
                            ..Default::default()
                        },
                        FileDoc {
                            file_name: "app/pkg/store/store_test.go".into(),
                            package: "store".into(),
                            ..Default::default()
                        },
                    ],
                },
            ],
        }
    }

    fn config(level: &str, options: ReportOptions) -> GolangConfig {
        GolangConfig {
            enabled: true,
            report_level: level.into(),
            report_options: options,
            paths: vec!["app".into()],
            ignores: vec![],
        }
    }

    #[test]
    fn tree_drawing() {
        let p = project();
        let gen = ReportGenerator::new(&p, "app", &config("standard", ReportOptions::default()));
        let mut out = String::new();
        write_tree(&mut out, &gen.directory_tree(), "", true);
        assert_eq!(
            out,
            "app\n    ├── cmd\n    │   └── main.go\n    └── pkg\n        └── store\n            ├── store.go\n            └── store_test.go\n"
        );
    }

    #[test]
    fn level_gating() {
        let p = project();
        let short = ReportGenerator::new(&p, "app", &config("short", ReportOptions::default()));
        assert!(short.should_include(Content::Structs));
        assert!(!short.should_include(Content::Functions));
        assert!(!short.should_include(Content::Imports));

        let std = ReportGenerator::new(&p, "app", &config("standard", ReportOptions::default()));
        assert!(std.should_include(Content::Examples));
        assert!(!std.should_include(Content::Tests));

        let opts = ReportOptions {
            show_examples: false,
            ..Default::default()
        };
        let complete = ReportGenerator::new(&p, "app", &config("complete", opts));
        assert!(!complete.should_include(Content::Examples));
    }

    #[test]
    fn markdown_respects_options() {
        let p = project();
        let opts = ReportOptions {
            show_internal_funcs: false,
            show_examples: false,
            ..Default::default()
        };
        let md = ReportGenerator::new(&p, "app", &config("complete", opts)).markdown();
        assert!(md.contains("## Package: cmd"));
        assert!(md.contains("- `fmt`"));
        assert!(md.contains("##### `Run()`"));
        assert!(!md.contains("`main()`"));
        assert!(!md.contains("ExampleRun"));
        assert!(md.contains("### File: store.go"));
        assert!(!md.contains("### File: store_test.go"));
    }
}
