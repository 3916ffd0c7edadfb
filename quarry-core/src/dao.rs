use crate::args::{bind_vector, Args, ArgsEnv, ArgsShape, IntoArgs, RecordEnv};
use crate::dialect::rewrite_markers;
use crate::dotsql::SqlItem;
use crate::outcome::{MaterializeCx, OutKind, Outcome};
use crate::statement::{parse_sql, BindMode, ParsedSql};
use crate::template::SqlPart;
use crate::{
    DaoOptions, Driver, Error, ErrorSink, Record, Result, RowsAffected, Value,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// An access object: a struct of [`Stmt`] members filled in by the binder.
///
/// Implemented by `#[derive(Dao)]`.
pub trait Dao: Sized {
    fn bind(driver: Arc<dyn Driver>, options: DaoOptions) -> Result<Self>;
}

/// One member of an access object, as declared by its annotations.
#[derive(Debug, Clone, Copy)]
pub struct MemberDecl {
    pub name: &'static str,
    pub sql: Option<&'static str>,
    pub sql_name: Option<&'static str>,
    pub attrs: &'static [(&'static str, &'static str)],
}

/// `sqlName` aliases may hop through other members this many times.
const MAX_ALIAS_DEPTH: usize = 10;

/// Shared state handed to every member while binding an access object.
pub struct BindContext {
    driver: Arc<dyn Driver>,
    options: Arc<DaoOptions>,
}

impl BindContext {
    pub fn new(driver: Arc<dyn Driver>, options: DaoOptions) -> Self {
        BindContext {
            driver,
            options: Arc::new(options),
        }
    }

    pub fn error_sink(&self) -> ErrorSink {
        self.options.error_sink()
    }

    /// Resolve, parse, and shape-check one member, producing its handle.
    pub fn stmt<A: IntoArgs, R: Outcome>(
        &self,
        name: &'static str,
        members: &[MemberDecl],
    ) -> Result<Stmt<A, R>> {
        let item = self.resolve(name, members)?;
        let part = item.compile()?;
        let preliminary = parse_sql(name, &item.raw())?;
        check_shapes(&preliminary, A::SHAPE, R::KIND)?;
        Ok(Stmt {
            inner: Arc::new(StmtInner {
                id: name.to_string(),
                part,
                preliminary,
                driver: self.driver.clone(),
                options: self.options.clone(),
            }),
            _shape: PhantomData,
        })
    }

    /// SQL source resolution: inline annotation first, then the registry
    /// under `sqlName` (or the member's own name), hopping through member
    /// aliases up to [`MAX_ALIAS_DEPTH`] levels.
    fn resolve(&self, name: &str, members: &[MemberDecl]) -> Result<SqlItem> {
        let member = members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::UnknownStatement(name.to_string()))?;
        if let Some(sql) = member.sql {
            return Ok(SqlItem::inline(name, sql, member.attrs));
        }
        let mut key = member.sql_name.unwrap_or(member.name);
        for _ in 0..MAX_ALIAS_DEPTH {
            if let Ok(item) = self.options.dotsql.get(key) {
                return Ok(item.clone());
            }
            let Some(next) = members.iter().find(|m| m.name == key) else {
                return Err(Error::UnknownStatement(key.to_string()));
            };
            if let Some(sql) = next.sql {
                return Ok(SqlItem::inline(key, sql, next.attrs));
            }
            key = next.sql_name.unwrap_or(next.name);
        }
        Err(Error::UnknownStatement(key.to_string()))
    }
}

/// The §4.4 arity table, applied at bind time.
fn check_shapes(parsed: &ParsedSql, shape: ArgsShape, kind: OutKind) -> Result<()> {
    let id = &parsed.id;
    match parsed.bind {
        BindMode::Named => {
            if !matches!(shape, ArgsShape::Named | ArgsShape::Batch) {
                return Err(Error::shape(
                    id,
                    "named binding requires a single record or mapping argument",
                ));
            }
        }
        BindMode::Seq | BindMode::Auto => match shape {
            ArgsShape::Positional(n) if n >= parsed.max_seq => {}
            ArgsShape::Positional(n) => {
                return Err(Error::shape(
                    id,
                    format!(
                        "statement references {} positional parameters, member takes {}",
                        parsed.max_seq, n
                    ),
                ));
            }
            _ => {
                return Err(Error::shape(
                    id,
                    "positional binding requires value arguments",
                ));
            }
        },
        // A statement without placeholders accepts any input shape: positional
        // values are ignored and a record argument may still splice field-SQL
        // contributions.
        BindMode::None => {}
    }
    if matches!(shape, ArgsShape::Batch) && (parsed.is_query || kind != OutKind::Unit) {
        return Err(Error::shape(id, "batch execution cannot produce a result"));
    }
    if parsed.is_query && !kind.wants_query() {
        return Err(Error::shape(id, "query statement needs a result shape"));
    }
    if !parsed.is_query && !kind.allows_exec() {
        return Err(Error::shape(id, "mutation statement cannot produce rows"));
    }
    Ok(())
}

struct StmtInner {
    id: String,
    part: SqlPart,
    preliminary: ParsedSql,
    driver: Arc<dyn Driver>,
    options: Arc<DaoOptions>,
}

/// A bound statement handle: the synthesised executor for one access-object
/// member. `A` is the declared input shape, `R` the declared result shape.
pub struct Stmt<A, R> {
    inner: Arc<StmtInner>,
    _shape: PhantomData<fn(A) -> R>,
}

impl<A, R> Clone for Stmt<A, R> {
    fn clone(&self) -> Self {
        Stmt {
            inner: self.inner.clone(),
            _shape: PhantomData,
        }
    }
}

impl<A, R> std::fmt::Debug for Stmt<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stmt").field("id", &self.inner.id).finish()
    }
}

fn wrap_driver(id: &str, sql: &str, e: Error) -> Error {
    match e {
        Error::DriverFailure { .. } | Error::Timeout { .. } => e,
        other => Error::driver(id, sql, other),
    }
}

impl<A: IntoArgs, R: Outcome> Stmt<A, R> {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The binding classification memoised at bind time.
    pub fn bind_mode(&self) -> BindMode {
        self.inner.preliminary.bind
    }

    /// Execute the statement with the given arguments.
    ///
    /// Clears the error sink, evaluates the template against the call's
    /// environment, binds the parameter vector, runs the driver operation and
    /// materialises the declared result. Failures are recorded in the sink
    /// and returned; `NoRows` is recorded but not logged as an error.
    pub async fn call(&self, args: A) -> Result<R> {
        let options = &self.inner.options;
        options.error_sink.clear();
        let fut = self.run(args.into_args());
        let result = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    id: self.inner.id.clone(),
                }),
            },
            None => fut.await,
        };
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if !matches!(e, Error::NoRows) {
                    options.logger.log_error(&e);
                }
                options.error_sink.record(&e);
                Err(e)
            }
        }
    }

    async fn run(&self, args: Args) -> Result<R> {
        if let Args::Batch(items) = &args {
            return self.run_batch(items).await;
        }
        let inner = &self.inner;
        let options = &inner.options;

        let rendered = inner.part.eval(&inner.id, &ArgsEnv(&args))?;
        let parsed = parse_sql(&inner.id, &rendered)?;
        let mut sql = parsed.sql.clone();
        let mut params = bind_vector(&parsed, &args)?;

        if let Args::Record(record) = &args {
            splice_contributions(record.as_ref(), &mut sql, &mut params);
        }

        let dialect = inner.driver.dialect();
        let exec_sql = rewrite_markers(&sql, dialect);
        options.logger.log_start(&inner.id, &exec_sql, &params);

        if parsed.is_query {
            let cx = MaterializeCx {
                id: &inner.id,
                sql: &sql,
                driver: inner.driver.as_ref(),
                dialect,
                params: &params,
                max_rows: options.query_max_rows,
                interceptor: options.row_interceptor.as_deref(),
            };
            let rows = inner.driver.query(&exec_sql, &params);
            R::materialize(rows, &cx).await
        } else {
            let affected = inner
                .driver
                .execute(&exec_sql, &params)
                .await
                .map_err(|e| wrap_driver(&inner.id, &sql, e))?;
            R::from_affected(affected)
        }
    }

    /// Transactional execution of an ordered sequence of records: prepare
    /// once, execute per element, commit atomically. The template is
    /// re-evaluated per element and re-prepared only when the rendered SQL
    /// changes; the first failure rolls the whole batch back.
    async fn run_batch(&self, items: &[Box<dyn Record>]) -> Result<R> {
        if items.is_empty() {
            return R::from_affected(RowsAffected::default());
        }
        let inner = &self.inner;
        let options = &inner.options;
        let dialect = inner.driver.dialect();

        let mut tx = inner
            .driver
            .begin()
            .await
            .map_err(|e| wrap_driver(&inner.id, "begin", e))?;

        let outcome: Result<RowsAffected> = async {
            let mut prepared: Option<(String, Box<dyn crate::Prepared>)> = None;
            let mut total = RowsAffected::default();
            for (index, item) in items.iter().enumerate() {
                let rendered = inner.part.eval(&inner.id, &RecordEnv(item.as_ref()))?;
                let parsed = parse_sql(&inner.id, &rendered)?;
                let params = named_record_vector(&parsed, item.as_ref())?;
                let exec_sql = rewrite_markers(&parsed.sql, dialect);
                let stale = prepared
                    .as_ref()
                    .map(|(sql, _)| sql != &exec_sql)
                    .unwrap_or(true);
                if stale {
                    let statement = tx
                        .prepare(&exec_sql)
                        .await
                        .map_err(|e| wrap_driver(&inner.id, &exec_sql, e))?;
                    prepared = Some((exec_sql.clone(), statement));
                }
                options.logger.log_start(&inner.id, &exec_sql, &params);
                let (_, statement) = prepared.as_mut().expect("statement prepared");
                let affected = statement.execute(&params).await.map_err(|e| {
                    Error::driver(&inner.id, &exec_sql, format!("batch item {}: {}", index, e))
                })?;
                total.extend([affected]);
            }
            Ok(total)
        }
        .await;

        match outcome {
            Ok(total) => {
                tx.commit()
                    .await
                    .map_err(|e| wrap_driver(&inner.id, "commit", e))?;
                R::from_affected(total)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}

fn named_record_vector(parsed: &ParsedSql, record: &dyn Record) -> Result<Vec<Value>> {
    let mut params = Vec::with_capacity(parsed.vars.len());
    for name in &parsed.vars {
        params.push(
            record
                .lookup(name)
                .ok_or_else(|| Error::UnresolvedParameter {
                    id: parsed.id.clone(),
                    name: name.clone(),
                })?,
        );
    }
    Ok(params)
}

/// Splice field-SQL contributions onto the rendered statement: `WHERE` glue
/// for the first joined contribution when the statement has none, `AND`
/// afterwards; unjoined fragments (the `Limit` tail) go in verbatim.
fn splice_contributions(record: &dyn Record, sql: &mut String, params: &mut Vec<Value>) {
    let contributions = record.contributions();
    if contributions.is_empty() {
        return;
    }
    let mut has_where = crate::paging::has_where(sql);
    for contribution in contributions {
        if contribution.joined {
            if has_where {
                sql.push_str(" and ");
            } else {
                sql.push_str(" where ");
                has_where = true;
            }
            sql.push_str(&contribution.sql);
        } else {
            sql.push(' ');
            sql.push_str(&contribution.sql);
        }
        params.extend(contribution.values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldContribution;

    #[test]
    fn shape_table() {
        let named = parse_sql("add", "insert into t(a) values(:a)").unwrap();
        assert!(check_shapes(&named, ArgsShape::Named, OutKind::Unit).is_ok());
        assert!(check_shapes(&named, ArgsShape::Batch, OutKind::Unit).is_ok());
        assert!(check_shapes(&named, ArgsShape::Positional(1), OutKind::Unit).is_err());
        assert!(check_shapes(&named, ArgsShape::None, OutKind::Unit).is_err());

        let seq = parse_sql("find", "select a from t where a=:2").unwrap();
        assert!(check_shapes(&seq, ArgsShape::Positional(2), OutKind::Many).is_ok());
        assert!(check_shapes(&seq, ArgsShape::Positional(1), OutKind::Many).is_err());
        assert!(check_shapes(&seq, ArgsShape::Named, OutKind::Many).is_err());

        let none = parse_sql("ddl", "create table t(a int)").unwrap();
        assert!(check_shapes(&none, ArgsShape::None, OutKind::Unit).is_ok());
        assert!(check_shapes(&none, ArgsShape::Positional(1), OutKind::Unit).is_ok());
        assert!(check_shapes(&none, ArgsShape::Named, OutKind::Unit).is_ok());

        let query = parse_sql("list", "select a from t").unwrap();
        assert!(check_shapes(&query, ArgsShape::None, OutKind::Unit).is_err());
        assert!(check_shapes(&query, ArgsShape::None, OutKind::Affected).is_err());
        assert!(check_shapes(&query, ArgsShape::None, OutKind::Scalar).is_ok());

        let exec = parse_sql("del", "delete from t where a=:1").unwrap();
        assert!(check_shapes(&exec, ArgsShape::Positional(1), OutKind::Many).is_err());
        assert!(check_shapes(&exec, ArgsShape::Positional(1), OutKind::Scalar).is_ok());
        assert!(check_shapes(&exec, ArgsShape::Positional(1), OutKind::Affected).is_ok());

        let batch_query = parse_sql("q", "select a from t where a=:a").unwrap();
        assert!(check_shapes(&batch_query, ArgsShape::Batch, OutKind::Unit).is_err());
    }

    struct Contributing {
        tail: Vec<FieldContribution>,
    }

    impl Record for Contributing {
        fn lookup(&self, _param: &str) -> Option<Value> {
            None
        }
        fn contributions(&self) -> Vec<FieldContribution> {
            self.tail.clone()
        }
    }

    #[test]
    fn contribution_glue() {
        let record = Contributing {
            tail: vec![
                FieldContribution {
                    sql: "age > ?".into(),
                    values: vec![Value::Int64(Some(10))],
                    joined: true,
                },
                FieldContribution {
                    sql: "addr = ?".into(),
                    values: vec![Value::from("x")],
                    joined: true,
                },
                FieldContribution {
                    sql: "limit ?,?".into(),
                    values: vec![Value::Int64(Some(0)), Value::Int64(Some(5))],
                    joined: false,
                },
            ],
        };
        let mut sql = "select * from person".to_string();
        let mut params = Vec::new();
        splice_contributions(&record, &mut sql, &mut params);
        assert_eq!(
            sql,
            "select * from person where age > ? and addr = ? limit ?,?"
        );
        assert_eq!(params.len(), 4);

        let mut sql = "select * from person where id = ?".to_string();
        let mut params = vec![Value::from("1")];
        splice_contributions(&record, &mut sql, &mut params);
        assert_eq!(
            sql,
            "select * from person where id = ? and age > ? and addr = ? limit ?,?"
        );
        assert_eq!(params.len(), 5);
    }
}
