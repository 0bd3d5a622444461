//! Per-line match predicates
//!
//! A [`LineMatcher`] is compiled once per command execution from a
//! [`Pattern`] (for `delete`/`show`) or a bare target (for `count`) and then
//! asked about each line in turn.

use crate::command::{Pattern, PatternType};
use crate::regex_error::{self, RegexError};
use memchr::memmem;
use regex::bytes::Regex;

#[derive(Debug)]
enum Test {
    Contains(memmem::Finder<'static>),
    StartsWith(Vec<u8>),
    EndsWith(Vec<u8>),
    Regex(Regex),
}

#[derive(Debug)]
pub struct LineMatcher {
    test: Test,
    negated: bool,
}

impl LineMatcher {
    /// Compile a natural or plain pattern
    ///
    /// A regex target honours the pattern type by anchoring: `lines starting
    /// with /\d+/` only matches digits at the start of the line. Whole-word
    /// matching applies to literal targets only and ignores the pattern type.
    pub fn from_pattern(pattern: &Pattern) -> Result<Self, RegexError> {
        let target = pattern.target.as_str();

        let test = if pattern.is_regex {
            // Compile as written first so errors point at the user's pattern
            let re = regex_error::compile(target)?;
            Test::Regex(match pattern.pattern_type {
                PatternType::Contains => re,
                PatternType::StartsWith => regex_error::compile(&format!("^(?:{target})"))?,
                PatternType::EndsWith => regex_error::compile(&format!("(?:{target})$"))?,
            })
        } else if pattern.whole_word {
            Test::Regex(regex_error::compile(&format!(r"\b{}\b", regex::escape(target)))?)
        } else {
            match pattern.pattern_type {
                PatternType::Contains => Test::Contains(memmem::Finder::new(target).into_owned()),
                PatternType::StartsWith => Test::StartsWith(target.as_bytes().to_vec()),
                PatternType::EndsWith => Test::EndsWith(target.as_bytes().to_vec()),
            }
        };

        Ok(Self {
            test,
            negated: pattern.negated,
        })
    }

    /// Plain containment, literal or regex
    pub fn containing(target: &str, is_regex: bool) -> Result<Self, RegexError> {
        Self::from_pattern(&Pattern::contains(target, is_regex))
    }

    pub fn is_match(&self, line: &[u8]) -> bool {
        let matched = match &self.test {
            Test::Contains(finder) => finder.find(line).is_some(),
            Test::StartsWith(prefix) => line.starts_with(prefix),
            Test::EndsWith(suffix) => line.ends_with(suffix),
            Test::Regex(re) => re.is_match(line),
        };
        matched != self.negated
    }
}
