//! Query tokenizer
//!
//! Turns a query such as `delete lines starting with '#'` into a stream of
//! [`Token`]s. The lexer never fails: a character that cannot start any token
//! becomes a one-character `Illegal` token and scanning carries on, so every
//! token stream ends in `Eof`.

use crate::token::{Position, Token, TokenType, lookup_ident};

/// Scanning cursor over a query string
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the character after `current`
    offset: usize,
    current: Option<char>,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input,
            offset: 0,
            current: None,
            line: 1,
            column: 0,
            finished: false,
        };
        lexer.read_char();
        lexer
    }

    /// Produce the next token; returns `Eof` forever once input is exhausted
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = Position {
            line: self.line,
            column: self.column,
        };

        match self.current {
            None => Token::new(TokenType::Eof, "", position),
            Some(ch) if ch.is_ascii_digit() => {
                Token::new(TokenType::Number, self.read_number(), position)
            }
            Some(ch) if ch.is_alphabetic() => {
                let literal = self.read_identifier();
                Token::new(lookup_ident(&literal), literal, position)
            }
            Some(quote @ ('\'' | '"')) => {
                Token::new(TokenType::String, self.read_string(quote), position)
            }
            Some('/') => Token::new(TokenType::Regex, self.read_regex(), position),
            Some(ch) => {
                self.read_char();
                Token::new(TokenType::Illegal, ch.to_string(), position)
            }
        }
    }

    /// Advance one character, tracking line and column
    ///
    /// Column counts consumed characters; the character following a newline
    /// starts the next line at column 1. Reaching end of input leaves the
    /// position on the last consumed character.
    fn read_char(&mut self) {
        match self.input[self.offset..].chars().next() {
            None => self.current = None,
            Some(ch) => {
                if self.current == Some('\n') {
                    self.line += 1;
                    self.column = 0;
                }
                self.current = Some(ch);
                self.offset += ch.len_utf8();
                self.column += 1;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while self.current.is_some_and(char::is_whitespace) {
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut literal = String::new();
        while let Some(ch) = self.current.filter(|c| c.is_alphabetic()) {
            literal.push(ch);
            self.read_char();
        }
        literal
    }

    fn read_number(&mut self) -> String {
        let mut literal = String::new();
        self.read_digits(&mut literal);

        if self.current == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            literal.push('.');
            self.read_char();
            self.read_digits(&mut literal);
        }

        literal
    }

    fn read_digits(&mut self, literal: &mut String) {
        while let Some(ch) = self.current.filter(char::is_ascii_digit) {
            literal.push(ch);
            self.read_char();
        }
    }

    /// Read a quoted string; `\` escapes only the opening quote or itself
    fn read_string(&mut self, quote: char) -> String {
        let mut literal = String::new();
        self.read_char();

        while let Some(ch) = self.current.filter(|c| *c != quote) {
            if ch == '\\' && matches!(self.peek_char(), Some(next) if next == quote || next == '\\') {
                self.read_char();
            }
            if let Some(ch) = self.current {
                literal.push(ch);
            }
            self.read_char();
        }

        // Closing quote (no-op when the string is unterminated)
        self.read_char();
        literal
    }

    /// Read a `/regex/` literal; `\/` is kept verbatim, backslash included
    fn read_regex(&mut self) -> String {
        let mut literal = String::new();
        self.read_char();

        while let Some(ch) = self.current.filter(|c| *c != '/') {
            if ch == '\\' && self.peek_char() == Some('/') {
                literal.push(ch);
                self.read_char();
            }
            if let Some(ch) = self.current {
                literal.push(ch);
            }
            self.read_char();
        }

        self.read_char();
        literal
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token including the final `Eof`, then stops
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.is(TokenType::Eof) {
            self.finished = true;
        }
        Some(token)
    }
}

/// Tokenize a whole query, `Eof` included
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}
