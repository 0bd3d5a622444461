//! Command model
//!
//! A parsed query is exactly one [`Command`]. The set of variants is closed;
//! every dispatch site matches exhaustively so a new variant has to be handled
//! everywhere before the crate compiles again.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One executable unit of the query language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// `replace foo with bar`, `replace /[0-9]+/ with N`
    Replace {
        source: String,
        is_regex: bool,
        replacement: String,
    },

    /// `delete foo`, `delete line 3`, `delete last 2 lines`
    Delete { selection: Selection },

    /// `show foo`, `show lines 2 to 4`, `show line numbers`
    Show {
        selection: Selection,
        show_line_numbers: bool,
    },

    /// `insert header before title`, `insert footer last`
    Insert {
        text: String,
        position: InsertPosition,
        /// Literal substring for `Before`/`After`; empty otherwise
        reference: String,
    },

    /// `convert to uppercase`, `trim`, `remove trailing spaces`
    Transform { kind: TransformKind },

    /// `count lines containing error`
    Count { target: String, is_regex: bool },

    /// Commands chained with `then`, run as a pipeline
    Compound { commands: Vec<Command> },

    /// Parse failure; never executed
    Illegal(Illegal),
}

/// Which lines a `delete`/`show` applies to. Exactly one mode per command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Every line (`show line numbers`)
    All,
    Range(LineRange),
    FirstN(usize),
    LastN(usize),
    Pattern(Pattern),
}

/// `end == 0` selects the single line `start`; otherwise `[start, end]` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn single(line: usize) -> Self {
        Self { start: line, end: 0 }
    }

    pub fn span(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn has_range(&self) -> bool {
        self.end > 0
    }

    /// 1-based line membership
    pub fn contains(&self, line_number: usize) -> bool {
        if self.has_range() {
            (self.start..=self.end).contains(&line_number)
        } else {
            line_number == self.start
        }
    }
}

/// A textual line matcher as written in the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub target: String,
    pub is_regex: bool,
    pub pattern_type: PatternType,
    pub negated: bool,
    pub whole_word: bool,
}

impl Pattern {
    /// Plain substring match, the meaning of a bare `delete foo`
    pub fn contains(target: impl Into<String>, is_regex: bool) -> Self {
        Self {
            target: target.into(),
            is_regex,
            pattern_type: PatternType::Contains,
            negated: false,
            whole_word: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Before,
    After,
    Prepend,
    Append,
}

impl InsertPosition {
    /// Whether this position needs a reference substring
    pub fn needs_reference(self) -> bool {
        matches!(self, InsertPosition::Before | InsertPosition::After)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Uppercase,
    Lowercase,
    Titlecase,
    Trim,
    TrimLeading,
    TrimTrailing,
}

/// A parse failure: offending token literal plus its 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illegal {
    pub identifier: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Illegal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "unexpected token: {}", self.identifier)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for Illegal {}

/// Discriminant of a [`Command`], used for dispatch logging and callers
/// that need to check for `Illegal` before executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Replace,
    Delete,
    Show,
    Insert,
    Transform,
    Count,
    Compound,
    Illegal,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Replace => "REPLACE",
            CommandKind::Delete => "DELETE",
            CommandKind::Show => "SHOW",
            CommandKind::Insert => "INSERT",
            CommandKind::Transform => "TRANSFORM",
            CommandKind::Count => "COUNT",
            CommandKind::Compound => "COMPOUND",
            CommandKind::Illegal => "ILLEGAL",
        };
        f.write_str(name)
    }
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Replace { .. } => CommandKind::Replace,
            Command::Delete { .. } => CommandKind::Delete,
            Command::Show { .. } => CommandKind::Show,
            Command::Insert { .. } => CommandKind::Insert,
            Command::Transform { .. } => CommandKind::Transform,
            Command::Count { .. } => CommandKind::Count,
            Command::Compound { .. } => CommandKind::Compound,
            Command::Illegal(_) => CommandKind::Illegal,
        }
    }

    pub fn is_illegal(&self) -> bool {
        matches!(self, Command::Illegal(_))
    }

    /// Split a parse result into an executable command or its parse error
    pub fn into_result(self) -> Result<Command, Illegal> {
        match self {
            Command::Illegal(illegal) => Err(illegal),
            command => Ok(command),
        }
    }
}
