//! Regex rules shared by the text-pattern extractors.
//!
//! A rule pairs one pattern with the function that folds its captures into
//! a target record. Rules never fail on unmatched input; they simply do not
//! apply.

use regex::{Captures, Regex};

use crate::error::Result;

type Apply<T> = fn(&mut T, &Captures);

pub struct Rule<T> {
    pub name: &'static str,
    pub pattern: Regex,
    /// Apply to every match instead of only the first.
    repeat: bool,
    apply: Apply<T>,
}

impl<T> Rule<T> {
    /// A rule applied to its first match only.
    pub fn first(name: &'static str, pattern: &str, apply: Apply<T>) -> Result<Self> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            repeat: false,
            apply,
        })
    }

    /// A rule applied to every non-overlapping match.
    pub fn each(name: &'static str, pattern: &str, apply: Apply<T>) -> Result<Self> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            repeat: true,
            apply,
        })
    }

    /// Fold matches into `target`; returns how many were applied.
    pub fn apply(&self, target: &mut T, text: &str) -> usize {
        let mut applied = 0;
        for caps in self.pattern.captures_iter(text) {
            (self.apply)(target, &caps);
            applied += 1;
            if !self.repeat {
                break;
            }
        }
        applied
    }
}

/// An ordered list of rules run over a whole file.
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleSet<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    pub fn apply(&self, target: &mut T, text: &str) {
        for rule in &self.rules {
            let n = rule.apply(target, text);
            if n > 0 {
                log::trace!("rule {} matched {} time(s)", rule.name, n);
            }
        }
    }

    pub fn rule(&self, name: &str) -> Option<&Rule<T>> {
        self.rules.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_word(words: &mut Vec<String>, caps: &Captures) {
        words.push(caps["word"].to_string());
    }

    #[test]
    fn first_and_each() {
        let first = Rule::first("word", r"(?P<word>\w+)", push_word).unwrap();
        let each = Rule::each("word", r"(?P<word>\w+)", push_word).unwrap();

        let mut out = Vec::new();
        assert_eq!(first.apply(&mut out, "a b c"), 1);
        assert_eq!(each.apply(&mut out, "a b c"), 3);
        assert_eq!(out, vec!["a", "a", "b", "c"]);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let rule: Result<Rule<()>> = Rule::first("bad", r"(", |_, _| {});
        assert!(rule.is_err());
    }

    #[test]
    fn rule_lookup_by_name() {
        let set: RuleSet<Vec<String>> = RuleSet::new(vec![
            Rule::<Vec<String>>::first("digits", r"(?P<n>\d+)", |v, c| v.push(c["n"].to_string()))
                .unwrap(),
        ]);
        assert!(set.rule("digits").is_some());
        assert!(set.rule("letters").is_none());
    }
}
