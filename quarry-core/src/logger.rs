use crate::{Error, Value};

/// Receives start-of-execution and error events from synthesised executors.
pub trait DaoLogger: Send + Sync {
    fn log_start(&self, id: &str, sql: &str, params: &[Value]);
    fn log_error(&self, err: &Error);
}

/// The default logger: drops everything.
pub struct NoopLogger;

impl DaoLogger for NoopLogger {
    fn log_start(&self, _id: &str, _sql: &str, _params: &[Value]) {}
    fn log_error(&self, _err: &Error) {}
}

/// Logger backed by `tracing`: executions at debug, failures at warn.
pub struct TracingLogger;

impl DaoLogger for TracingLogger {
    fn log_start(&self, id: &str, sql: &str, params: &[Value]) {
        tracing::debug!(id, sql, ?params, "executing statement");
    }

    fn log_error(&self, err: &Error) {
        tracing::warn!(error = %err, "statement failed");
    }
}
