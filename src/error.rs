//! Error taxonomy for schedule reads.

use crate::structured_text::StructuredTextError;

/// A value that could not be read as the type a builder asked for.
///
/// These never abort a read on their own; see [`crate::config::ReadOptions::ignore_errors`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("Column {column}: cannot read {found:?} as {expected}")]
    Cast {
        column: String,
        expected: &'static str,
        found: String,
    },
    #[error("Invalid time of day: {0:?}")]
    Time(String),
    #[error("Invalid exception day count: {0:?}")]
    ExceptionDay(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Invalid file: missing header record (failed at line {line})")]
    InvalidFile { line: usize },
    #[error("Read error (failed at line {line}): {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Project {0} not found")]
    ProjectNotFound(i32),
    #[error("Field error: {0}")]
    Field(#[from] FieldError),
    #[error("Structured text error: {0}")]
    StructuredText(#[from] StructuredTextError),
}

pub type Result<T> = std::result::Result<T, ReadError>;

/// Applies the ignore-errors setting to value-level failures.
///
/// Ignored failures are logged and kept so they can be attached to the
/// schedule that is eventually returned.
#[derive(Debug, Default)]
pub struct Tolerance {
    ignore_errors: bool,
    ignored: Vec<FieldError>,
}

impl Tolerance {
    pub fn new(ignore_errors: bool) -> Self {
        Self {
            ignore_errors,
            ignored: Vec::new(),
        }
    }

    /// Pass a value through, or treat a failed read as absent when ignoring.
    pub fn value<T>(&mut self, result: std::result::Result<Option<T>, FieldError>) -> Result<Option<T>> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => self.report(e).map(|_| None),
        }
    }

    pub fn report(&mut self, error: FieldError) -> Result<()> {
        if self.ignore_errors {
            tracing::warn!("Ignoring error: {}", error);
            self.ignored.push(error);
            Ok(())
        } else {
            Err(ReadError::Field(error))
        }
    }

    pub fn ignored(&self) -> &[FieldError] {
        &self.ignored
    }

    pub fn into_ignored(self) -> Vec<FieldError> {
        self.ignored
    }
}
