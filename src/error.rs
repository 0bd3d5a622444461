//! Execution errors

use crate::regex_error::RegexError;
use std::io;
use thiserror::Error;

/// Failure while running a command over a stream
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Regex(#[from] RegexError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line} is longer than the {limit} byte limit")]
    LineTooLong { line: usize, limit: usize },
}

/// Failure of the in-memory stream connecting two pipeline stages
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("downstream closed")]
    ReaderGone,

    #[error("upstream stage failed: {0}")]
    UpstreamFailed(String),
}

impl ExecError {
    /// A write that failed only because the next stage stopped reading
    ///
    /// This is how an upstream stage learns that its consumer finished early
    /// (`show first 3` after a long replace), so it is not a failure by itself.
    pub fn is_downstream_gone(&self) -> bool {
        match self {
            ExecError::Io(err) => {
                err.kind() == io::ErrorKind::BrokenPipe
                    && err
                        .get_ref()
                        .and_then(|inner| inner.downcast_ref::<HandoffError>())
                        .is_some_and(|handoff| *handoff == HandoffError::ReaderGone)
            }
            _ => false,
        }
    }
}
