//! Compiled ignore patterns matched against full paths.

use regex::Regex;

/// A set of regular expressions; a path is ignored when any of them matches.
///
/// Invalid patterns are logged and dropped when the set is built, so a typo
/// in configuration never hides more files than intended.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Regex>,
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match Regex::new(pattern) {
                Ok(re) => compiled.push(re),
                Err(e) => log::warn!("invalid ignore pattern '{}': {}", pattern, e),
            }
        }
        Self { patterns: compiled }
    }

    pub fn is_match(&self, path: &str) -> bool {
        let normalised = path.replace('\\', "/");
        self.patterns.iter().any(|re| re.is_match(&normalised))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
