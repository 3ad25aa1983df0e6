//! Error taxonomy for graph construction.
//!
//! Every failure aborts the whole run. Nothing is retried or skipped, and a
//! run that returns an error has produced no valid output.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{0}")]
    Usage(String),

    #[error("malformed record at line {line}: {message}")]
    InputFormat { line: u64, message: String },

    #[error("invalid {field} {value:?} at line {line}: {reason}")]
    NumericParse {
        line: u64,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("IO error while {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GraphError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short name of the error kind, printed ahead of the cause in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphError::Usage(_) => "usage",
            GraphError::InputFormat { .. } => "input_format",
            GraphError::NumericParse { .. } => "numeric_parse",
            GraphError::Io { .. } => "io",
            GraphError::Config(_) => "config",
        }
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
