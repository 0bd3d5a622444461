//! ssed: stream text through English-like editing queries
//!
//! A query such as `show lines containing ERROR then show last 20` is
//! tokenized by [`lexer`], parsed into a [`Command`] by [`parser`] and run
//! over a byte stream by [`executor`]. The outer modules (`cli`, `config`,
//! `input`, `editor`, `preview`, `logger`) serve the `ssed` binary.

pub mod cli;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod error_helpers;
pub mod executor;
pub mod input;
pub mod lexer;
pub mod line_io;
pub mod logger;
pub mod matcher;
pub mod parser;
pub mod pipeline;
pub mod preview;
pub mod regex_error;
pub mod ring_buffer;
pub mod token;

// Re-export commonly used types for convenience
pub use command::{
    Command, CommandKind, Illegal, InsertPosition, LineRange, Pattern, PatternType, Selection,
    TransformKind,
};
pub use error::{ExecError, HandoffError};
pub use executor::{ExecOptions, Executor, execute};
pub use lexer::Lexer;
pub use parser::{Parser, parse};
pub use regex_error::RegexError;
pub use token::{Position, Token, TokenType};

/// Failure of a whole query: it did not parse, or it failed while running
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid query: {0}")]
    Parse(#[from] Illegal),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Parse `query` and run it from `input` to `output` with default options
pub fn run_query<R, W>(query: &str, input: R, output: W) -> Result<(), Error>
where
    R: std::io::Read + Send,
    W: std::io::Write,
{
    let command = parse(query).into_result()?;
    execute(&command, input, output)?;
    Ok(())
}
