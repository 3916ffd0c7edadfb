use crate::dialect::classify;
use crate::{Driver, Error, Result, Value};
use futures::StreamExt;
use std::time::{Duration, Instant};

/// Options for [`exec_sql`].
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Stop after this many rows; `0` means unlimited.
    pub max_rows: usize,
    /// Replacement text for NULL cells.
    pub null_replace: String,
}

impl Default for ExecOptions {
    fn default() -> Self {
        ExecOptions {
            max_rows: 0,
            null_replace: "(null)".into(),
        }
    }
}

/// The report produced by [`exec_sql`]: a string grid for queries, affected
/// counts for mutations.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
    pub is_query: bool,
    pub first_key: String,
    pub cost: Duration,
}

/// Classify and run a single statement, rendering query results into a
/// string grid. Useful for ad-hoc consoles and dump tooling.
pub async fn exec_sql(driver: &dyn Driver, sql: &str, options: &ExecOptions) -> Result<ExecResult> {
    let start = Instant::now();
    let (first_key, is_query) = classify(sql);

    if !is_query {
        let affected = driver
            .execute(sql, &[])
            .await
            .map_err(|e| match e {
                Error::DriverFailure { .. } => e,
                other => Error::driver("exec_sql", sql, other),
            })?;
        return Ok(ExecResult {
            rows_affected: affected.rows_affected,
            last_insert_id: if first_key == "INSERT" {
                affected.last_insert_id
            } else {
                None
            },
            is_query,
            first_key,
            cost: start.elapsed(),
            ..ExecResult::default()
        });
    }

    let mut headers = Vec::new();
    let mut rows = Vec::new();
    let mut stream = driver.query(sql, &[]);
    while let Some(row) = stream.next().await {
        let row = row.map_err(|e| match e {
            Error::DriverFailure { .. } => e,
            other => Error::driver("exec_sql", sql, other),
        })?;
        if headers.is_empty() {
            headers = row.labels.to_vec();
        }
        rows.push(
            row.values
                .iter()
                .map(|v| render_cell(v, &options.null_replace))
                .collect(),
        );
        if options.max_rows != 0 && rows.len() >= options.max_rows {
            break;
        }
    }
    Ok(ExecResult {
        headers,
        rows,
        is_query,
        first_key,
        cost: start.elapsed(),
        ..ExecResult::default()
    })
}

fn render_cell(value: &Value, null_replace: &str) -> String {
    if value.is_null() {
        return null_replace.to_string();
    }
    match value {
        Value::Boolean(Some(v)) => v.to_string(),
        Value::Int8(Some(v)) => v.to_string(),
        Value::Int16(Some(v)) => v.to_string(),
        Value::Int32(Some(v)) => v.to_string(),
        Value::Int64(Some(v)) => v.to_string(),
        Value::UInt8(Some(v)) => v.to_string(),
        Value::UInt16(Some(v)) => v.to_string(),
        Value::UInt32(Some(v)) => v.to_string(),
        Value::UInt64(Some(v)) => v.to_string(),
        Value::Float32(Some(v)) => v.to_string(),
        Value::Float64(Some(v)) => v.to_string(),
        Value::Varchar(Some(v)) => v.clone(),
        Value::Blob(Some(v)) => format!("(blob {} bytes)", v.len()),
        Value::Date(Some(v)) => v.to_string(),
        Value::Time(Some(v)) => v.to_string(),
        Value::Timestamp(Some(v)) => v.to_string(),
        Value::TimestampWithTimezone(Some(v)) => v.to_string(),
        Value::Uuid(Some(v)) => v.to_string(),
        _ => String::new(),
    }
}
