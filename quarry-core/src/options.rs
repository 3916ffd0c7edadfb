use crate::logger::{DaoLogger, NoopLogger};
use crate::{DotSql, Error, Result};
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Slot receiving the most recent call error. Cleared at the start of every
/// invocation; shared between the binder, the executors, and any `ErrorSink`
/// field of the access object.
#[derive(Clone, Default)]
pub struct ErrorSink {
    slot: Arc<Mutex<Option<Error>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent error, leaving it in place.
    pub fn last(&self) -> Option<Error> {
        self.slot.lock().expect("error sink poisoned").clone()
    }

    /// Take the most recent error out of the sink.
    pub fn take(&self) -> Option<Error> {
        self.slot.lock().expect("error sink poisoned").take()
    }

    pub(crate) fn clear(&self) {
        *self.slot.lock().expect("error sink poisoned") = None;
    }

    pub(crate) fn record(&self, err: &Error) {
        *self.slot.lock().expect("error sink poisoned") = Some(err.clone());
    }
}

impl std::fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSink").field("last", &self.last()).finish()
    }
}

/// Hook invoked after each materialised row with the row index and the
/// materialised output. Returning `false` halts iteration without error; an
/// error aborts and propagates.
pub trait RowInterceptor: Send + Sync {
    fn after(&self, index: usize, row: &dyn Any) -> Result<bool>;
}

impl<F> RowInterceptor for F
where
    F: Fn(usize, &dyn Any) -> Result<bool> + Send + Sync,
{
    fn after(&self, index: usize, row: &dyn Any) -> Result<bool> {
        self(index, row)
    }
}

/// The option bag for binding an access object.
#[derive(Clone)]
pub struct DaoOptions {
    pub(crate) error_sink: ErrorSink,
    pub(crate) timeout: Option<Duration>,
    pub(crate) query_max_rows: i64,
    pub(crate) logger: Arc<dyn DaoLogger>,
    pub(crate) row_interceptor: Option<Arc<dyn RowInterceptor>>,
    pub(crate) dotsql: DotSql,
}

impl Default for DaoOptions {
    fn default() -> Self {
        DaoOptions {
            error_sink: ErrorSink::new(),
            timeout: None,
            query_max_rows: -1,
            logger: Arc::new(NoopLogger),
            row_interceptor: None,
            dotsql: DotSql::default(),
        }
    }
}

impl DaoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-call timeout applied around every driver operation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap on materialised rows per query; `-1` means unlimited.
    pub fn with_query_max_rows(mut self, max_rows: i64) -> Self {
        self.query_max_rows = max_rows;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn DaoLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_row_interceptor(mut self, interceptor: Arc<dyn RowInterceptor>) -> Self {
        self.row_interceptor = Some(interceptor);
        self
    }

    /// Load the dot-SQL registry from a file.
    pub fn with_sql_file(mut self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        self.dotsql.merge(DotSql::load_file(path)?);
        Ok(self)
    }

    /// Load the dot-SQL registry from a string.
    pub fn with_sql_str(mut self, source: &str) -> Result<Self> {
        self.dotsql.merge(DotSql::load_str(source)?);
        Ok(self)
    }

    /// Handle to the error sink shared with every bound statement.
    pub fn error_sink(&self) -> ErrorSink {
        self.error_sink.clone()
    }
}
