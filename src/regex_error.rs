//! Regex Error Handling
//!
//! Compilation failures for `/.../` patterns are classified into a few
//! categories so the message shown to the user can say what went wrong and
//! how to fix it, instead of echoing the raw `regex` crate diagnostic.

use regex::bytes::Regex;
use std::fmt;

/// A pattern that failed to compile, with a classification and a hint
#[derive(Debug, Clone, PartialEq)]
pub struct RegexError {
    pub pattern: String,
    pub kind: RegexErrorKind,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegexErrorKind {
    /// `(`, `[` or `{` without its closer; position is a char index
    UnclosedDelimiter { delimiter: char, position: usize },
    /// `\q` and friends
    InvalidEscape { sequence: String, position: usize },
    /// `*` with nothing before it, bad `{n,m}`
    InvalidQuantifier { message: String },
    /// Look-around is not supported by the regex engine
    Lookaround { message: String },
    /// Backreferences inside patterns are not supported
    Backreference { message: String },
    /// The compiled program would exceed the engine's size limit
    TooBig { message: String },
    Syntax { message: String },
}

impl RegexError {
    pub fn from_regex_error(err: &regex::Error, pattern: &str) -> Self {
        let message = err.to_string();
        let kind = classify(&message, pattern);
        let suggestion = suggest(&kind, pattern);

        RegexError {
            pattern: pattern.to_string(),
            kind,
            suggestion,
        }
    }

    fn summary(&self) -> String {
        match &self.kind {
            RegexErrorKind::UnclosedDelimiter {
                delimiter,
                position,
            } => format!(
                "missing closing '{}' for '{}' at position {}",
                closer_for(*delimiter),
                delimiter,
                position
            ),
            RegexErrorKind::InvalidEscape { sequence, position } => {
                format!("invalid escape sequence '{sequence}' at position {position}")
            }
            RegexErrorKind::InvalidQuantifier { message } => format!("invalid quantifier: {message}"),
            RegexErrorKind::Lookaround { message } => format!("unsupported look-around: {message}"),
            RegexErrorKind::Backreference { message } => {
                format!("unsupported backreference: {message}")
            }
            RegexErrorKind::TooBig { message } => format!("pattern too large: {message}"),
            RegexErrorKind::Syntax { message } => message.clone(),
        }
    }
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid regex /{}/: {}", self.pattern, self.summary())?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RegexError {}

/// Compile a pattern for matching raw line bytes, converting failures into
/// a [`RegexError`]
pub fn compile(pattern: &str) -> Result<Regex, RegexError> {
    Regex::new(pattern).map_err(|err| RegexError::from_regex_error(&err, pattern))
}

fn classify(error_msg: &str, pattern: &str) -> RegexErrorKind {
    let lower = error_msg.to_lowercase();

    if lower.contains("size limit") {
        return RegexErrorKind::TooBig {
            message: error_msg.to_string(),
        };
    }

    if lower.contains("unclosed") || lower.contains("unterminated") || lower.contains("unopened") {
        for (open, close) in [('(', ')'), ('[', ']'), ('{', '}')] {
            if let Some(position) = find_unclosed_delimiter(pattern, open, close) {
                return RegexErrorKind::UnclosedDelimiter {
                    delimiter: open,
                    position,
                };
            }
        }
    }

    if lower.contains("look-around") || lower.contains("lookaround") {
        return RegexErrorKind::Lookaround {
            message: last_line(error_msg),
        };
    }

    if lower.contains("backreference") {
        return RegexErrorKind::Backreference {
            message: last_line(error_msg),
        };
    }

    if lower.contains("escape") {
        if let Some(position) = find_invalid_escape(pattern) {
            return RegexErrorKind::InvalidEscape {
                sequence: escape_at(pattern, position),
                position,
            };
        }
    }

    if lower.contains("repetition") || lower.contains("quantifier") || lower.contains("repeat") {
        return RegexErrorKind::InvalidQuantifier {
            message: last_line(error_msg),
        };
    }

    RegexErrorKind::Syntax {
        message: last_line(error_msg),
    }
}

fn suggest(kind: &RegexErrorKind, pattern: &str) -> Option<String> {
    match kind {
        RegexErrorKind::UnclosedDelimiter { delimiter, .. } => {
            let closer = closer_for(*delimiter);
            Some(format!(
                "Add a closing '{closer}', e.g. /{pattern}{closer}/, or escape the opener as '\\{delimiter}' to match it literally"
            ))
        }
        RegexErrorKind::InvalidEscape { sequence, .. } => Some(format!(
            "'{sequence}' is not a recognised escape. Common escapes are \\d \\w \\s \\b \\t \\n; escape punctuation like \\. or \\/"
        )),
        RegexErrorKind::InvalidQuantifier { .. } => Some(
            "A quantifier (*, +, ?, {n,m}) must follow something to repeat, e.g. 'a*' or '(ab)+'"
                .to_string(),
        ),
        RegexErrorKind::Lookaround { .. } => Some(
            "Look-ahead and look-behind are not available; match the surrounding text and use a capture group with $1 in the replacement"
                .to_string(),
        ),
        RegexErrorKind::Backreference { .. } => Some(
            "Backreferences like \\1 only work in replacements, written as $1 or ${name}".to_string(),
        ),
        RegexErrorKind::TooBig { .. } => {
            Some("Simplify the pattern or reduce large counted repetitions like {1000}".to_string())
        }
        RegexErrorKind::Syntax { .. } => None,
    }
}

fn closer_for(delimiter: char) -> char {
    match delimiter {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// The `regex` crate renders a caret diagram first; the summary is last
fn last_line(message: &str) -> String {
    message
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or(message)
        .trim()
        .trim_start_matches("error: ")
        .to_string()
}

/// Char index of the innermost unmatched opener, skipping escapes and
/// (for non-bracket delimiters) the insides of character classes
fn find_unclosed_delimiter(pattern: &str, open: char, close: char) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_class = false;
    let mut chars = pattern.chars().enumerate();

    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if open != '[' {
            if c == '[' {
                in_class = true;
                continue;
            }
            if c == ']' {
                in_class = false;
                continue;
            }
            if in_class {
                continue;
            }
        }
        if c == open {
            stack.push(i);
        } else if c == close {
            stack.pop();
        }
    }

    stack.pop()
}

fn find_invalid_escape(pattern: &str) -> Option<usize> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i + 1 < chars.len() {
        if chars[i] == '\\' {
            let valid = matches!(
                chars[i + 1],
                'n' | 't' | 'r' | 'f' | 'v' | 'a' | '0'..='9'
                    | 'x' | 'u' | 'U' | 'p' | 'P'
                    | 'w' | 'W' | 'd' | 'D' | 's' | 'S' | 'b' | 'B' | 'A' | 'z'
            ) || !chars[i + 1].is_alphanumeric();

            if !valid {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    None
}

fn escape_at(pattern: &str, position: usize) -> String {
    pattern.chars().skip(position).take(2).collect()
}
