//! Query parser
//!
//! Recursive descent over the token stream with one token of lookahead
//! beyond the current one. Each `parse_*` method starts with the command
//! keyword as the current token and leaves the last token it consumed as the
//! current token, so the caller only has to look at `peek` to decide whether
//! a `then` chain continues.

use crate::command::{
    Command, Illegal, InsertPosition, LineRange, Pattern, PatternType, Selection, TransformKind,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};
use std::fmt;

type ParseResult<T> = Result<T, Illegal>;

/// Query parser with a (current, peek) token window
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    peek: Token,
}

/// Parse a query string into a single command (possibly `Command::Illegal`)
pub fn parse(query: &str) -> Command {
    Parser::new(Lexer::new(query)).parse()
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let cur = lexer.next_token();
        let peek = lexer.next_token();
        Self { lexer, cur, peek }
    }

    /// Parse one command, or a `then` chain of them as `Command::Compound`
    ///
    /// The first failure anywhere in the chain is returned as the whole
    /// result; later stages are not parsed.
    pub fn parse(&mut self) -> Command {
        let command = match self.parse_chain() {
            Ok(command) => command,
            Err(illegal) => Command::Illegal(illegal),
        };
        tracing::debug!(kind = %command.kind(), "parsed query");
        command
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.cur = std::mem::replace(&mut self.peek, next);
    }

    fn error(&self, expectation: impl fmt::Display) -> Illegal {
        let position = self.cur.position;
        Illegal {
            identifier: self.cur.literal.clone(),
            message: format!(
                "line {}, column {}: {}",
                position.line, position.column, expectation
            ),
            line: position.line,
            column: position.column,
        }
    }

    fn peek_ends_command(&self) -> bool {
        matches!(self.peek.token_type, TokenType::Eof | TokenType::Then)
    }

    fn parse_chain(&mut self) -> ParseResult<Command> {
        let mut commands = vec![self.parse_single()?];

        loop {
            // Words after a complete command read as filler ("delete error messages")
            while !self.peek_ends_command() {
                self.next_token();
                tracing::trace!(word = %self.cur.literal, "ignoring trailing word");
            }
            if !self.peek.is(TokenType::Then) {
                break;
            }
            self.next_token();
            self.next_token();
            commands.push(self.parse_single()?);
        }

        if commands.len() == 1 {
            Ok(commands.remove(0))
        } else {
            Ok(Command::Compound { commands })
        }
    }

    fn parse_single(&mut self) -> ParseResult<Command> {
        match self.cur.token_type {
            TokenType::Replace => self.parse_replace(),
            TokenType::Delete => {
                let selection = self.parse_selection("delete", false)?;
                Ok(Command::Delete { selection })
            }
            TokenType::Show => {
                let selection = self.parse_selection("show", true)?;
                let show_line_numbers = selection == Selection::All;
                Ok(Command::Show {
                    selection,
                    show_line_numbers,
                })
            }
            TokenType::Insert => self.parse_insert(),
            TokenType::Convert | TokenType::Trim | TokenType::Remove => self.parse_transform(),
            TokenType::Count => self.parse_count(),
            TokenType::Eof => Err(self.error(
                "empty input, expected a command (replace, delete, show, insert, convert, count)",
            )),
            _ => Err(self.error(format!(
                "unknown command {:?}, expected replace, delete, show, insert, convert, or count",
                self.cur.literal
            ))),
        }
    }

    /// `replace <pattern> with [<replacement>]`
    fn parse_replace(&mut self) -> ParseResult<Command> {
        self.next_token();

        if self.cur.is(TokenType::Eof) {
            return Err(self.error("expected pattern to replace, got end of input"));
        }

        let source = self.cur.literal.clone();
        let is_regex = self.cur.is(TokenType::Regex);

        self.next_token();

        if !self.cur.is(TokenType::With) {
            return Err(self.error(format!(
                "expected 'with' after {source:?} in replace command"
            )));
        }

        // An empty replacement deletes the match
        let replacement = if self.peek_ends_command() {
            String::new()
        } else {
            self.next_token();
            self.cur.literal.clone()
        };

        Ok(Command::Replace {
            source,
            is_regex,
            replacement,
        })
    }

    /// Line selection shared by `delete` and `show`
    fn parse_selection(&mut self, verb: &str, allow_line_numbers: bool) -> ParseResult<Selection> {
        self.next_token();

        match self.cur.token_type {
            TokenType::First | TokenType::Last => {
                let is_first = self.cur.is(TokenType::First);
                self.next_token();

                let n = self.expect_number("expected number after 'first' or 'last'", "invalid number")?;

                if matches!(self.peek.token_type, TokenType::Line | TokenType::Lines) {
                    self.next_token();
                }

                Ok(if is_first {
                    Selection::FirstN(n)
                } else {
                    Selection::LastN(n)
                })
            }
            TokenType::Line if allow_line_numbers && self.peek.is(TokenType::Numbers) => {
                self.next_token();
                Ok(Selection::All)
            }
            TokenType::Lines
                if matches!(
                    self.peek.token_type,
                    TokenType::Not | TokenType::Starting | TokenType::Ending | TokenType::Containing
                ) =>
            {
                self.parse_natural_pattern().map(Selection::Pattern)
            }
            TokenType::Line | TokenType::Lines => self.parse_line_range().map(Selection::Range),
            TokenType::Eof | TokenType::Then => Err(self.error(format!(
                "expected pattern or line selection after '{verb}'"
            ))),
            _ => Ok(Selection::Pattern(Pattern::contains(
                self.cur.literal.clone(),
                self.cur.is(TokenType::Regex),
            ))),
        }
    }

    /// `lines [not] (starting [with] | ending [with] | containing [whole word]) <target>`
    fn parse_natural_pattern(&mut self) -> ParseResult<Pattern> {
        let mut negated = false;

        if self.peek.is(TokenType::Not) {
            self.next_token();
            negated = true;
        }

        let (pattern_type, whole_word) = match self.peek.token_type {
            TokenType::Starting | TokenType::Ending => {
                let pattern_type = if self.peek.is(TokenType::Starting) {
                    PatternType::StartsWith
                } else {
                    PatternType::EndsWith
                };
                self.next_token();
                if self.peek.is(TokenType::With) {
                    self.next_token();
                }
                self.next_token();
                (pattern_type, false)
            }
            TokenType::Containing => {
                self.next_token();
                self.next_token();

                let whole_word = self.cur.is(TokenType::Whole) && self.peek.is(TokenType::Word);
                if whole_word {
                    self.next_token();
                    self.next_token();
                }
                (PatternType::Contains, whole_word)
            }
            _ => {
                self.next_token();
                return Err(self.error(format!(
                    "expected 'starting', 'ending', or 'containing' after 'not', got {:?}",
                    self.cur.literal
                )));
            }
        };

        let (target, is_regex) = self.pattern_target("lines")?;

        Ok(Pattern {
            target,
            is_regex,
            pattern_type,
            negated,
            whole_word,
        })
    }

    /// `line <n>` or `lines <n> to <m>`
    fn parse_line_range(&mut self) -> ParseResult<LineRange> {
        self.next_token();

        if !self.cur.is(TokenType::Number) {
            return Err(self.error(format!("expected line number, got {:?}", self.cur.literal)));
        }
        let start = self.parse_number("invalid line number")?;
        let mut range = LineRange::single(start);

        if self.peek.is(TokenType::To) {
            self.next_token();
            self.next_token();

            if !self.cur.is(TokenType::Number) {
                return Err(self.error(format!(
                    "expected end line number after 'to', got {:?}",
                    self.cur.literal
                )));
            }
            range.end = self.parse_number("invalid end line number")?;
        }

        Ok(range)
    }

    /// `insert <text> (before <ref> | after <ref> | first | last)`
    fn parse_insert(&mut self) -> ParseResult<Command> {
        self.next_token();

        if self.cur.is(TokenType::Eof) {
            return Err(self.error("expected text to insert, got end of input"));
        }

        let text = self.cur.literal.clone();

        self.next_token();

        let position = match self.cur.token_type {
            TokenType::Before => InsertPosition::Before,
            TokenType::After => InsertPosition::After,
            TokenType::First => InsertPosition::Prepend,
            TokenType::Last => InsertPosition::Append,
            _ => {
                return Err(self.error(format!(
                    "expected 'before', 'after', 'first', or 'last' in insert command, got {:?}",
                    self.cur.literal
                )));
            }
        };

        if !position.needs_reference() {
            return Ok(Command::Insert {
                text,
                position,
                reference: String::new(),
            });
        }

        let keyword = self.cur.literal.clone();
        self.next_token();

        if matches!(self.cur.token_type, TokenType::Eof | TokenType::Then) {
            return Err(self.error(format!("expected reference pattern after '{keyword}'")));
        }

        Ok(Command::Insert {
            text,
            position,
            reference: self.cur.literal.clone(),
        })
    }

    /// `convert to <case>`, `trim [whitespace]`, `remove (trailing|leading) [spaces|whitespace]`
    fn parse_transform(&mut self) -> ParseResult<Command> {
        let kind = match self.cur.token_type {
            TokenType::Convert => {
                self.next_token();

                if !self.cur.is(TokenType::To) {
                    return Err(self.error("expected 'to' after 'convert'"));
                }

                self.next_token();

                match self.cur.token_type {
                    TokenType::Uppercase => TransformKind::Uppercase,
                    TokenType::Lowercase => TransformKind::Lowercase,
                    TokenType::Titlecase => TransformKind::Titlecase,
                    _ => {
                        return Err(self.error(
                            "expected 'uppercase', 'lowercase', or 'titlecase' after 'convert to'",
                        ));
                    }
                }
            }
            TokenType::Trim => {
                if self.peek.is(TokenType::Whitespace) {
                    self.next_token();
                } else if !self.peek_ends_command() {
                    self.next_token();
                    return Err(self.error("expected 'whitespace' or end of input after 'trim'"));
                }
                TransformKind::Trim
            }
            TokenType::Remove => {
                self.next_token();

                let (kind, side) = match self.cur.token_type {
                    TokenType::Trailing => (TransformKind::TrimTrailing, "trailing"),
                    TokenType::Leading => (TransformKind::TrimLeading, "leading"),
                    _ => return Err(self.error("expected 'trailing' or 'leading' after 'remove'")),
                };

                if matches!(self.peek.token_type, TokenType::Spaces | TokenType::Whitespace) {
                    self.next_token();
                } else if !self.peek_ends_command() {
                    self.next_token();
                    return Err(self.error(format!(
                        "expected 'spaces' or 'whitespace' after 'remove {side}'"
                    )));
                }
                kind
            }
            _ => return Err(self.error("unexpected token in transform command")),
        };

        Ok(Command::Transform { kind })
    }

    /// `count [lines] [containing] <target>`
    fn parse_count(&mut self) -> ParseResult<Command> {
        self.next_token();

        if self.cur.is(TokenType::Lines) {
            self.next_token();
        }

        if self.cur.is(TokenType::Containing) {
            self.next_token();
        }

        let (target, is_regex) = self.pattern_target("count")?;

        Ok(Command::Count { target, is_regex })
    }

    /// Take the current token as a pattern; any token but `Eof`/`then` will do
    fn pattern_target(&self, after: &str) -> ParseResult<(String, bool)> {
        if matches!(self.cur.token_type, TokenType::Eof | TokenType::Then) {
            return Err(self.error(format!("expected pattern after '{after}'")));
        }
        Ok((self.cur.literal.clone(), self.cur.is(TokenType::Regex)))
    }

    fn expect_number(&self, missing: &str, invalid: &str) -> ParseResult<usize> {
        if !self.cur.is(TokenType::Number) {
            return Err(self.error(missing));
        }
        self.parse_number(invalid)
    }

    fn parse_number(&self, invalid: &str) -> ParseResult<usize> {
        self.cur
            .literal
            .parse::<usize>()
            .map_err(|_| self.error(format!("{invalid} {:?}", self.cur.literal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn illegal_message(query: &str) -> String {
        match parse(query) {
            Command::Illegal(illegal) => illegal.message,
            other => panic!("Expected Illegal for {query:?}, got {other:?}"),
        }
    }

    fn selection(query: &str) -> Selection {
        match parse(query) {
            Command::Delete { selection } | Command::Show { selection, .. } => selection,
            other => panic!("Expected Delete or Show for {query:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_replace() {
        let cases = [
            ("replace foo with bar", "foo", "bar"),
            ("replace 'hello' with 'world'", "hello", "world"),
            ("replace 123 with 456", "123", "456"),
            ("replace foo with", "foo", ""),
        ];
        for (query, source, replacement) in cases {
            assert_eq!(
                parse(query),
                Command::Replace {
                    source: source.to_string(),
                    is_regex: false,
                    replacement: replacement.to_string(),
                },
                "query: {query}"
            );
        }
    }

    #[test]
    fn test_parse_replace_regex() {
        assert_eq!(
            parse("replace /[0-9]+/ with NUM"),
            Command::Replace {
                source: "[0-9]+".to_string(),
                is_regex: true,
                replacement: "NUM".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_replace_missing_with() {
        let message = illegal_message("replace foo bar");
        assert!(message.contains("expected 'with'"), "{message}");
        assert!(message.starts_with("line 1, column 13:"), "{message}");
        assert!(message.contains("\"foo\""), "{message}");
    }

    #[test]
    fn test_parse_replace_missing_pattern() {
        assert!(illegal_message("replace").contains("expected pattern to replace"));
    }

    #[test]
    fn test_parse_delete_and_show_targets() {
        assert_eq!(selection("delete foo"), Selection::Pattern(Pattern::contains("foo", false)));
        assert_eq!(
            selection("delete 'error message'"),
            Selection::Pattern(Pattern::contains("error message", false))
        );
        assert_eq!(selection("show 500"), Selection::Pattern(Pattern::contains("500", false)));
        assert_eq!(selection("show /err.*/"), Selection::Pattern(Pattern::contains("err.*", true)));
        // Punctuation lexes as an illegal token but is still a usable target
        assert_eq!(selection("delete #"), Selection::Pattern(Pattern::contains("#", false)));
    }

    #[test]
    fn test_parse_delete_without_target() {
        assert!(illegal_message("delete").contains("expected pattern or line selection after 'delete'"));
    }

    #[test]
    fn test_parse_line_ranges() {
        assert_eq!(selection("delete line 5"), Selection::Range(LineRange::single(5)));
        assert_eq!(selection("delete lines 5 to 10"), Selection::Range(LineRange::span(5, 10)));
        assert_eq!(selection("show line 1"), Selection::Range(LineRange::single(1)));
        assert_eq!(selection("show lines 2 to 4"), Selection::Range(LineRange::span(2, 4)));
    }

    #[test]
    fn test_parse_line_range_errors() {
        assert!(illegal_message("delete line").contains("expected line number"));
        assert!(illegal_message("show line foo").contains("expected line number, got \"foo\""));
        assert!(illegal_message("show lines 2 to").contains("expected end line number after 'to'"));
        assert!(illegal_message("show line 2.5").contains("invalid line number \"2.5\""));
    }

    #[test]
    fn test_parse_first_last() {
        assert_eq!(selection("show first 5 lines"), Selection::FirstN(5));
        assert_eq!(selection("show first 3"), Selection::FirstN(3));
        assert_eq!(selection("show last 10 lines"), Selection::LastN(10));
        assert_eq!(selection("show last 2"), Selection::LastN(2));
        assert_eq!(selection("delete first 1 line"), Selection::FirstN(1));
        assert_eq!(selection("delete last 3 lines"), Selection::LastN(3));
    }

    #[test]
    fn test_parse_first_last_errors() {
        assert!(illegal_message("show first lines").contains("expected number after 'first' or 'last'"));
        assert!(illegal_message("delete last 1.5").contains("invalid number \"1.5\""));
    }

    #[test]
    fn test_parse_show_line_numbers() {
        assert_eq!(
            parse("show line numbers"),
            Command::Show {
                selection: Selection::All,
                show_line_numbers: true,
            }
        );
        // Only `show` understands line numbers
        assert!(illegal_message("delete line numbers").contains("expected line number"));
    }

    #[test]
    fn test_parse_natural_patterns() {
        let cases = [
            ("show lines starting with #", "#", PatternType::StartsWith, false, false),
            ("show lines starting foo", "foo", PatternType::StartsWith, false, false),
            ("show lines ending with ;", ";", PatternType::EndsWith, false, false),
            ("show lines containing error", "error", PatternType::Contains, false, false),
            ("delete lines starting with '#'", "#", PatternType::StartsWith, false, false),
            ("delete lines not containing debug", "debug", PatternType::Contains, true, false),
            ("show lines not ending with '.'", ".", PatternType::EndsWith, true, false),
            ("show lines containing whole word cat", "cat", PatternType::Contains, false, true),
            ("delete lines not containing whole word x", "x", PatternType::Contains, true, true),
        ];

        for (query, target, pattern_type, negated, whole_word) in cases {
            assert_eq!(
                selection(query),
                Selection::Pattern(Pattern {
                    target: target.to_string(),
                    is_regex: false,
                    pattern_type,
                    negated,
                    whole_word,
                }),
                "query: {query}"
            );
        }
    }

    #[test]
    fn test_parse_natural_pattern_regex_target() {
        match selection("show lines containing /^\\d+$/") {
            Selection::Pattern(pattern) => {
                assert!(pattern.is_regex);
                assert_eq!(pattern.target, "^\\d+$");
            }
            other => panic!("Expected pattern selection, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_natural_pattern_errors() {
        assert!(illegal_message("show lines not 5").contains("expected 'starting', 'ending', or 'containing' after 'not'"));
        assert!(illegal_message("delete lines containing").contains("expected pattern after 'lines'"));
    }

    #[test]
    fn test_parse_insert() {
        let cases = [
            ("insert header before title", "header", InsertPosition::Before, "title"),
            ("insert footer after content", "footer", InsertPosition::After, "content"),
            ("insert 'preamble' first", "preamble", InsertPosition::Prepend, ""),
            ("insert 'end' last", "end", InsertPosition::Append, ""),
        ];
        for (query, text, position, reference) in cases {
            assert_eq!(
                parse(query),
                Command::Insert {
                    text: text.to_string(),
                    position,
                    reference: reference.to_string(),
                },
                "query: {query}"
            );
        }
    }

    #[test]
    fn test_parse_insert_errors() {
        assert!(illegal_message("insert").contains("expected text to insert"));
        assert!(illegal_message("insert foo").contains("expected 'before'"));
        assert!(illegal_message("insert foo bar").contains("expected 'before', 'after', 'first', or 'last'"));
        assert!(illegal_message("insert foo before").contains("expected reference pattern after 'before'"));
        assert!(illegal_message("insert foo after").contains("expected reference pattern after 'after'"));
    }

    #[test]
    fn test_parse_transforms() {
        let cases = [
            ("convert to uppercase", TransformKind::Uppercase),
            ("convert to lowercase", TransformKind::Lowercase),
            ("convert to titlecase", TransformKind::Titlecase),
            ("trim", TransformKind::Trim),
            ("trim whitespace", TransformKind::Trim),
            ("remove trailing spaces", TransformKind::TrimTrailing),
            ("remove trailing whitespace", TransformKind::TrimTrailing),
            ("remove leading spaces", TransformKind::TrimLeading),
            ("remove leading", TransformKind::TrimLeading),
        ];
        for (query, kind) in cases {
            assert_eq!(parse(query), Command::Transform { kind }, "query: {query}");
        }
    }

    #[test]
    fn test_parse_transform_errors() {
        assert!(illegal_message("convert uppercase").contains("expected 'to'"));
        assert!(illegal_message("convert to bold").contains("expected 'uppercase'"));
        assert!(illegal_message("trim everything").contains("expected 'whitespace'"));
        assert!(illegal_message("remove spaces").contains("expected 'trailing' or 'leading'"));
        assert!(illegal_message("remove leading tabs").contains("after 'remove leading'"));
    }

    #[test]
    fn test_parse_count() {
        let cases = [
            ("count error", "error", false),
            ("count lines containing error", "error", false),
            ("count containing warning", "warning", false),
            ("count /^ERROR/", "^ERROR", true),
            ("count lines containing /[0-9]+/", "[0-9]+", true),
        ];
        for (query, target, is_regex) in cases {
            assert_eq!(
                parse(query),
                Command::Count {
                    target: target.to_string(),
                    is_regex,
                },
                "query: {query}"
            );
        }
        assert!(illegal_message("count lines").contains("expected pattern after 'count'"));
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        let message = illegal_message("frobnicate foo");
        assert!(message.contains("unknown command \"frobnicate\""), "{message}");
        assert!(illegal_message("").contains("empty input"));
        assert!(illegal_message("   ").contains("empty input"));
    }

    #[test]
    fn test_illegal_carries_token_and_position() {
        match parse("delete foo\nthen bogus") {
            Command::Illegal(illegal) => {
                assert_eq!(illegal.identifier, "bogus");
                assert_eq!((illegal.line, illegal.column), (2, 6));
                assert!(illegal.message.starts_with("line 2, column 6:"));
            }
            other => panic!("Expected Illegal, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_compound() {
        let cases = [
            ("show error then delete warning", vec!["SHOW", "DELETE"]),
            ("trim then convert to uppercase", vec!["TRANSFORM", "TRANSFORM"]),
            (
                "delete lines starting with '#' then replace TODO with DONE",
                vec!["DELETE", "REPLACE"],
            ),
            ("show first 3 lines then count x", vec!["SHOW", "COUNT"]),
            (
                "replace a with then delete b then remove trailing then trim",
                vec!["REPLACE", "DELETE", "TRANSFORM", "TRANSFORM"],
            ),
        ];

        for (query, kinds) in cases {
            match parse(query) {
                Command::Compound { commands } => {
                    let names: Vec<String> =
                        commands.iter().map(|c| c.kind().to_string()).collect();
                    assert_eq!(names, kinds, "query: {query}");
                }
                other => panic!("Expected Compound for {query:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_single_is_not_wrapped() {
        assert_eq!(parse("delete foo").kind().to_string(), "DELETE");
    }

    #[test]
    fn test_parse_compound_errors_fail_fast() {
        assert!(illegal_message("delete foo then").contains("empty input"));
        assert!(illegal_message("delete foo then unknown bar").contains("unknown command"));
        // The first failing stage wins even if later stages are fine
        let message = illegal_message("replace a b then delete c");
        assert!(message.contains("expected 'with'"), "{message}");
        let message = illegal_message("delete c then replace a b then frob");
        assert!(message.contains("expected 'with'"), "{message}");
    }

    #[test]
    fn test_parse_trailing_words_ignored() {
        assert_eq!(
            parse("delete error messages"),
            Command::Delete {
                selection: Selection::Pattern(Pattern::contains("error", false)),
            }
        );
        assert_eq!(
            parse("show first 5 lines please"),
            Command::Show {
                selection: Selection::FirstN(5),
                show_line_numbers: false,
            }
        );
        assert_eq!(
            parse("replace foo with bar baz"),
            Command::Replace {
                source: "foo".to_string(),
                is_regex: false,
                replacement: "bar".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_trailing_words_before_then() {
        match parse("delete error messages then show first 2 lines please") {
            Command::Compound { commands } => {
                assert_eq!(commands.len(), 2);
                assert_eq!(commands[1].kind().to_string(), "SHOW");
            }
            other => panic!("Expected Compound, got {other:?}"),
        }
    }

    #[test]
    fn test_replacement_may_be_keyword() {
        assert_eq!(
            parse("replace x with first"),
            Command::Replace {
                source: "x".to_string(),
                is_regex: false,
                replacement: "first".to_string(),
            }
        );
    }
}
