use std::io;

use thiserror::Error;

/// Errors raised while encoding a family. Validation failures are detected before anything is written to the
/// sink, so they never leave a partial family behind. A failing sink is reported with the number of bytes it
/// had already accepted.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("MetricFamily has no name")]
    NoName,
    #[error("expected {expected} in metric {family} {labels}")]
    TypeMismatch {
        expected: String,
        family: String,
        labels: String,
    },
    #[error("invalid metric in family {family}: {reason}")]
    InvalidMetric { family: String, reason: String },
    #[error("write failed after {written} bytes: {source}")]
    Io {
        written: usize,
        #[source]
        source: io::Error,
    },
}

impl EncodeError {
    /// How many bytes reached the sink before the error. Only a failing sink leaves any behind.
    pub fn bytes_written(&self) -> usize {
        match self {
            EncodeError::Io { written, .. } => *written,
            _ => 0,
        }
    }

    pub(crate) fn after(self, flushed: usize) -> EncodeError {
        match self {
            EncodeError::Io { written, source } => EncodeError::Io {
                written: flushed + written,
                source,
            },
            err => err,
        }
    }
}

/// Errors raised while decoding. Every variant except `Io` names the (1-based) line it was raised on, and any
/// of them ends the stream.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("line {line}: {message}")]
    InvalidMetric { line: usize, message: String },
    #[error("line {line}: found two metrics with the same labelset")]
    DuplicateMetric { line: usize },
    #[error("line {line}: invalid UTF-8")]
    InvalidUtf8 { line: usize },
    #[error("input ended after line {line} without an EOF token")]
    MissingEof { line: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ParseError {
    pub(crate) fn invalid(line: usize, message: impl Into<String>) -> ParseError {
        ParseError::InvalidMetric {
            line,
            message: message.into(),
        }
    }

    /// The line the error was raised on, if it came from the text rather than the source.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. }
            | ParseError::InvalidMetric { line, .. }
            | ParseError::DuplicateMetric { line }
            | ParseError::InvalidUtf8 { line }
            | ParseError::MissingEof { line } => Some(*line),
            ParseError::Io(_) => None,
        }
    }
}
