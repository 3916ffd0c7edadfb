use crate::statement::BindMode;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by binding, template evaluation and execution.
///
/// The enum is `Clone` (payloads are strings or `Arc`s) so the same error can
/// be recorded in the [`ErrorSink`](crate::ErrorSink) and returned to the
/// caller. Parameter values never appear in error text.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("statement `{id}`: illegal mixed bind modes ({first} and {second})")]
    InvalidBinding {
        id: String,
        first: BindMode,
        second: BindMode,
    },

    #[error("statement `{id}`: {reason}")]
    ShapeMismatch { id: String, reason: String },

    #[error("sql `{0}` could not be found")]
    UnknownStatement(String),

    #[error("statement `{id}`: malformed template: {reason}")]
    MalformedTemplate { id: String, reason: String },

    #[error("statement `{id}`: bad expression `{expr}`: {reason}")]
    BadExpression {
        id: String,
        expr: String,
        reason: String,
    },

    #[error("statement `{id}`: no value for parameter `{name}`")]
    UnresolvedParameter { id: String, name: String },

    #[error("statement `{id}` failed: {message}\nsql: {sql}")]
    DriverFailure {
        id: String,
        sql: String,
        message: String,
    },

    #[error("query returned no rows")]
    NoRows,

    #[error("statement `{id}` timed out")]
    Timeout { id: String },

    #[error("cannot convert {value} to {target}")]
    Conversion {
        value: String,
        target: &'static str,
    },

    #[error("unsupported statement: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),
}

impl Error {
    pub fn shape(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn driver(
        id: impl Into<String>,
        sql: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Error::DriverFailure {
            id: id.into(),
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn conversion(value: &crate::Value, target: &'static str) -> Self {
        Error::Conversion {
            value: format!("{:?}", value),
            target,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}
