//! Token types and the keyword table
//!
//! Every word of the query language that carries grammatical meaning is a
//! keyword. Keywords are matched by exact lowercase spelling only, so
//! `REPLACE` or `Replace` lex as plain identifiers.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Closed set of token categories produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Command keywords
    Replace,
    Delete,
    Show,
    Insert,
    Convert,
    Trim,
    Remove,
    Count,

    // Modifiers
    With,
    First,
    Last,
    Before,
    After,
    Line,
    Lines,
    To,
    Uppercase,
    Lowercase,
    Titlecase,
    Whitespace,
    Trailing,
    Leading,
    Spaces,
    Containing,
    Starting,
    Ending,
    Not,
    Whole,
    Word,
    Numbers,
    Then,

    // Generic categories
    Identifier,
    String,
    Number,
    Regex,
    Eof,
    Illegal,
}

impl TokenType {
    /// Uppercase name used in diagnostics and debug output
    pub fn name(self) -> &'static str {
        match self {
            TokenType::Replace => "REPLACE",
            TokenType::Delete => "DELETE",
            TokenType::Show => "SHOW",
            TokenType::Insert => "INSERT",
            TokenType::Convert => "CONVERT",
            TokenType::Trim => "TRIM",
            TokenType::Remove => "REMOVE",
            TokenType::Count => "COUNT",
            TokenType::With => "WITH",
            TokenType::First => "FIRST",
            TokenType::Last => "LAST",
            TokenType::Before => "BEFORE",
            TokenType::After => "AFTER",
            TokenType::Line => "LINE",
            TokenType::Lines => "LINES",
            TokenType::To => "TO",
            TokenType::Uppercase => "UPPERCASE",
            TokenType::Lowercase => "LOWERCASE",
            TokenType::Titlecase => "TITLECASE",
            TokenType::Whitespace => "WHITESPACE",
            TokenType::Trailing => "TRAILING",
            TokenType::Leading => "LEADING",
            TokenType::Spaces => "SPACES",
            TokenType::Containing => "CONTAINING",
            TokenType::Starting => "STARTING",
            TokenType::Ending => "ENDING",
            TokenType::Not => "NOT",
            TokenType::Whole => "WHOLE",
            TokenType::Word => "WORD",
            TokenType::Numbers => "NUMBERS",
            TokenType::Then => "THEN",
            TokenType::Identifier => "IDENTIFIER",
            TokenType::String => "STRING",
            TokenType::Number => "NUMBER",
            TokenType::Regex => "REGEX",
            TokenType::Eof => "EOF",
            TokenType::Illegal => "ILLEGAL",
        }
    }

    /// True for every entry of the keyword table
    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenType::Identifier
                | TokenType::String
                | TokenType::Number
                | TokenType::Regex
                | TokenType::Eof
                | TokenType::Illegal
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 1-based source position of a token's first character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A single token with its category, text, and source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub position: Position,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, position: Position) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            position,
        }
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        self.token_type == token_type
    }
}

/// Keyword table, built on first use and never mutated afterwards
static KEYWORDS: LazyLock<HashMap<&'static str, TokenType>> = LazyLock::new(|| {
    HashMap::from([
        ("replace", TokenType::Replace),
        ("delete", TokenType::Delete),
        ("insert", TokenType::Insert),
        ("show", TokenType::Show),
        ("with", TokenType::With),
        ("first", TokenType::First),
        ("last", TokenType::Last),
        ("before", TokenType::Before),
        ("after", TokenType::After),
        ("line", TokenType::Line),
        ("lines", TokenType::Lines),
        ("to", TokenType::To),
        ("convert", TokenType::Convert),
        ("uppercase", TokenType::Uppercase),
        ("lowercase", TokenType::Lowercase),
        ("titlecase", TokenType::Titlecase),
        ("trim", TokenType::Trim),
        ("whitespace", TokenType::Whitespace),
        ("trailing", TokenType::Trailing),
        ("leading", TokenType::Leading),
        ("spaces", TokenType::Spaces),
        ("remove", TokenType::Remove),
        ("count", TokenType::Count),
        ("containing", TokenType::Containing),
        ("starting", TokenType::Starting),
        ("ending", TokenType::Ending),
        ("not", TokenType::Not),
        ("whole", TokenType::Whole),
        ("word", TokenType::Word),
        ("numbers", TokenType::Numbers),
        ("then", TokenType::Then),
    ])
});

/// Classify an identifier: keyword on exact match, otherwise `Identifier`
pub fn lookup_ident(ident: &str) -> TokenType {
    KEYWORDS.get(ident).copied().unwrap_or(TokenType::Identifier)
}
