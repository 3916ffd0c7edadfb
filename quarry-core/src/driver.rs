use crate::{Result, RowLabeled, RowsAffected, Value};

pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;
pub type RowStream<'a> = futures::stream::BoxStream<'a, Result<RowLabeled>>;

/// Database family, used by the marker rewriter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Generic,
    Mysql,
    Postgres,
    Sqlite,
}

/// The database handle the runtime executes against.
///
/// Statements arrive with `?` markers already rewritten for the driver's
/// dialect and a parameter vector of the same length. Implementations are
/// expected to be cheap to share behind an `Arc`.
pub trait Driver: Send + Sync {
    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    /// Run a query, streaming labeled rows.
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> RowStream<'a>;

    /// Run a mutation, returning the affected-row count and last insert id.
    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value])
    -> BoxFuture<'a, Result<RowsAffected>>;

    /// Open a transaction.
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>>>;
}

pub trait Transaction: Send {
    fn prepare<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<Box<dyn Prepared>>>;
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

pub trait Prepared: Send {
    fn execute<'a>(&'a mut self, params: &'a [Value]) -> BoxFuture<'a, Result<RowsAffected>>;
}
