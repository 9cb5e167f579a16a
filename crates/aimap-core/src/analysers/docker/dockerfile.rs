//! Line-oriented Dockerfile parser driven by a table of instruction rules.

use regex::{Captures, Regex};

use super::{Command, Dockerfile, EnvVar, Stage, Step};
use crate::error::Result;

type Apply = fn(&mut Dockerfile, &Captures);

/// One instruction pattern and the action it performs on the document.
pub struct Rule {
    pub instruction: &'static str,
    pub pattern: Regex,
    apply: Apply,
}

impl Rule {
    fn new(instruction: &'static str, pattern: &str, apply: Apply) -> Result<Self> {
        Ok(Self {
            instruction,
            pattern: Regex::new(pattern)?,
            apply,
        })
    }

    /// Apply the rule when it matches; returns whether it did.
    pub fn try_apply(&self, doc: &mut Dockerfile, line: &str) -> bool {
        match self.pattern.captures(line) {
            Some(caps) => {
                (self.apply)(doc, &caps);
                true
            }
            None => false,
        }
    }
}

pub struct DockerfileParser {
    rules: Vec<Rule>,
}

impl DockerfileParser {
    /// Compile the instruction table. Order is the match priority.
    pub fn new() -> Result<Self> {
        let rules = vec![
            Rule::new(
                "FROM",
                r"(?i)^FROM\s+(?:--platform=\S+\s+)?(?P<image>\S+)(?:\s+AS\s+(?P<stage>\S+))?",
                apply_from,
            )?,
            Rule::new("RUN", r"(?i)^RUN\s+(?P<args>.+)", |doc, caps| push_step(doc, "RUN", caps))?,
            Rule::new("COPY", r"(?i)^COPY\s+(?P<args>.+)", |doc, caps| push_step(doc, "COPY", caps))?,
            Rule::new("ADD", r"(?i)^ADD\s+(?P<args>.+)", |doc, caps| push_step(doc, "ADD", caps))?,
            Rule::new("ENV", r"(?i)^ENV\s+(?P<args>.+)", apply_env)?,
            Rule::new("EXPOSE", r"(?i)^EXPOSE\s+(?P<args>.+)", |doc, caps| {
                doc.exposed_ports
                    .extend(caps["args"].split_whitespace().map(String::from));
            })?,
            Rule::new("VOLUME", r"(?i)^VOLUME\s+(?P<args>.+)", |doc, caps| {
                doc.volumes.extend(list_or_words(&caps["args"]));
            })?,
            Rule::new("CMD", r"(?i)^CMD\s+(?P<args>.+)", |doc, caps| {
                doc.commands.push(Command::parse("CMD", &caps["args"]));
            })?,
            Rule::new("ENTRYPOINT", r"(?i)^ENTRYPOINT\s+(?P<args>.+)", |doc, caps| {
                doc.commands.push(Command::parse("ENTRYPOINT", &caps["args"]));
            })?,
        ];
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Parse Dockerfile text. Unknown instructions are ignored.
    pub fn parse(&self, path: &str, content: &str) -> Dockerfile {
        let mut doc = Dockerfile {
            path: path.to_string(),
            ..Default::default()
        };

        for line in logical_lines(content) {
            match self.rules.iter().find(|r| r.try_apply(&mut doc, &line)) {
                Some(rule) => log::trace!("{}: {}", path, rule.instruction),
                None => log::trace!("{}: unhandled line {:?}", path, line),
            }
        }
        doc
    }
}

/// Join `\` continuations and drop blank and comment lines.
pub fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with('#') || (line.is_empty() && pending.is_empty()) {
            continue;
        }
        match line.strip_suffix('\\') {
            Some(head) => {
                pending.push_str(head.trim_end());
                pending.push(' ');
            }
            None => {
                pending.push_str(line);
                let joined = pending.trim().to_string();
                if !joined.is_empty() {
                    lines.push(joined);
                }
                pending.clear();
            }
        }
    }

    let rest = pending.trim();
    if !rest.is_empty() {
        lines.push(rest.to_string());
    }
    lines
}

fn apply_from(doc: &mut Dockerfile, caps: &Captures) {
    let base = caps["image"].to_string();
    if doc.base_image.is_empty() {
        doc.base_image = base.clone();
    }
    doc.stages.push(Stage {
        index: doc.stages.len(),
        name: caps.name("stage").map(|m| m.as_str().to_string()),
        base,
        steps: Vec::new(),
    });
}

fn push_step(doc: &mut Dockerfile, instruction: &str, caps: &Captures) {
    let step = Step {
        instruction: instruction.to_string(),
        arguments: caps["args"].trim().to_string(),
    };
    match doc.stages.last_mut() {
        Some(stage) => stage.steps.push(step),
        None => log::debug!(
            "{}: {} before any FROM is ignored",
            doc.path,
            instruction
        ),
    }
}

/// `ENV K=V [K2=V2 ...]` or the legacy `ENV K V...` form.
fn apply_env(doc: &mut Dockerfile, caps: &Captures) {
    let body = caps["args"].trim();
    let first = body.split_whitespace().next().unwrap_or_default();

    if first.contains('=') {
        for pair in split_words(body) {
            if let Some((key, value)) = pair.split_once('=') {
                doc.env.push(EnvVar {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
    } else {
        let value = body[first.len()..].trim();
        doc.env.push(EnvVar {
            key: first.to_string(),
            value: unquote(value).to_string(),
        });
    }
}

/// JSON array form (`["a", "b"]`) or whitespace separated words.
pub fn list_or_words(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
            return items;
        }
    }
    text.split_whitespace().map(String::from).collect()
}

/// Split on whitespace outside double quotes, removing the quotes.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

impl Command {
    /// Exec form keeps the JSON array as `args`; shell form keeps only the text.
    pub fn parse(kind: &str, text: &str) -> Self {
        let text = text.trim();
        let args = if text.starts_with('[') {
            serde_json::from_str::<Vec<String>>(text).unwrap_or_default()
        } else {
            Vec::new()
        };
        Self {
            kind: kind.to_string(),
            command: text.to_string(),
            args,
        }
    }
}
