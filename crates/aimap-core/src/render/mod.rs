//! Diagram rendering: text escaping, identifier allocation and the diagram IR.

pub mod diagram;
pub mod mermaid;
pub mod plantuml;

use std::collections::HashMap;

pub use diagram::{standard_preamble, Container, Diagram, Edge, Node, Note, Section, Shape};

/// Escape a free-text value for embedding in a quoted label or note.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Keep unquoted diagram text on one line: line breaks become `\n`/`\r`,
/// everything else is left as written.
pub fn single_line(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}

/// Inverse of [`escape`].
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Turn an arbitrary name into a diagram identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, and a leading `_` is
/// added when the result would not start with a letter or underscore.
pub fn sanitize_id(name: &str) -> String {
    let mut id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match id.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => id.insert(0, '_'),
    }
    id
}

/// Allocates collision-free identifiers within one document.
#[derive(Debug, Default)]
pub struct UniqueIds {
    seen: HashMap<String, usize>,
    by_key: HashMap<String, String>,
}

impl UniqueIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for `key`; the same key always gets the same identifier.
    pub fn id_for(&mut self, key: &str, base: &str) -> String {
        if let Some(id) = self.by_key.get(key) {
            return id.clone();
        }
        let id = self.fresh(base);
        self.by_key.insert(key.to_string(), id.clone());
        id
    }

    /// Previously allocated identifier for `key`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(|s| s.as_str())
    }

    /// A new identifier derived from `base`, suffixed `_2`, `_3`, ... on collision.
    pub fn fresh(&mut self, base: &str) -> String {
        let base = sanitize_id(base);
        let mut candidate = base.clone();
        loop {
            let count = self.seen.entry(candidate.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                return candidate;
            }
            let n = *count;
            candidate = format!("{}_{}", base, n);
        }
    }
}
