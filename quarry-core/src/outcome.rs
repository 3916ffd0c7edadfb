use crate::as_value::scan_value;
use crate::driver::{Dialect, Driver, RowStream};
use crate::options::RowInterceptor;
use crate::{AsValue, Error, Result, RowLabeled, RowsAffected, Value};
use futures::StreamExt;
use std::collections::HashMap;

/// Bind-time classification of a member's output shape. Drives the §4.4
/// dispatch together with [`ArgsShape`](crate::ArgsShape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutKind {
    /// No return; mutation only.
    Unit,
    /// Full affected-rows result; mutation only.
    Affected,
    /// Single scalar: first column of the first row for queries, the
    /// affected-row count for mutations.
    Scalar,
    /// Positional scalar tuple from the first row.
    Tuple,
    /// Exactly one record; zero value on empty.
    One,
    /// One record behind an `Option`; `NoRows` on empty.
    OptionalOne,
    /// All rows.
    Many,
    /// All rows plus a rewritten COUNT(*) total.
    Paged,
}

impl OutKind {
    pub fn wants_query(self) -> bool {
        !matches!(self, OutKind::Unit | OutKind::Affected)
    }

    pub fn allows_exec(self) -> bool {
        matches!(self, OutKind::Unit | OutKind::Affected | OutKind::Scalar)
    }
}

/// Per-call context handed to the materialiser.
pub struct MaterializeCx<'a> {
    pub id: &'a str,
    /// Rendered statement before the dialect marker rewrite.
    pub sql: &'a str,
    pub driver: &'a dyn Driver,
    pub dialect: Dialect,
    pub params: &'a [Value],
    /// Row cap; negative means unlimited.
    pub max_rows: i64,
    pub interceptor: Option<&'a dyn RowInterceptor>,
}

impl MaterializeCx<'_> {
    fn wrap(&self, e: Error) -> Error {
        match e {
            Error::DriverFailure { .. } => e,
            other => Error::driver(self.id, self.sql, other),
        }
    }
}

/// Column-to-field materialisation of one row.
///
/// Implemented by `#[derive(Record)]` for records, built in for mappings and
/// scalars. Unmatched columns are ignored; fields without a matching column
/// keep their zero value; NULL columns scan to the field kind's zero value.
pub trait FromRow: Sized + Send + 'static {
    fn from_row(row: &RowLabeled) -> Result<Self>;
}

impl FromRow for HashMap<String, Value> {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(std::iter::zip(row.labels.iter(), row.values.iter())
            .map(|(l, v)| (l.clone(), v.clone()))
            .collect())
    }
}

/// A row sequence together with the total produced by the COUNT(*) rewrite.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paged<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

/// A declared result shape and its materialisation.
pub trait Outcome: Sized + Send {
    const KIND: OutKind;

    /// Assemble the result of a mutation.
    fn from_affected(affected: RowsAffected) -> Result<Self> {
        let _ = affected;
        Err(Error::shape("", "result shape needs a query statement"))
    }

    /// Assemble the result of a query from its row stream.
    fn materialize(
        rows: RowStream<'_>,
        cx: &MaterializeCx<'_>,
    ) -> impl std::future::Future<Output = Result<Self>> + Send;
}

async fn first_row(rows: &mut RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Option<RowLabeled>> {
    match rows.next().await {
        None => Ok(None),
        Some(row) => row.map(Some).map_err(|e| cx.wrap(e)),
    }
}

fn scan_col<T: AsValue>(row: &RowLabeled, index: usize) -> Result<T> {
    match row.values.get(index) {
        Some(value) => scan_value(value.clone()),
        None => Ok(T::zero_value()),
    }
}

fn intercept<T: FromRow>(cx: &MaterializeCx<'_>, index: usize, item: &T) -> Result<bool> {
    match cx.interceptor {
        Some(ic) => ic.after(index, item),
        None => Ok(true),
    }
}

/// Materialise exactly one row, or the zero value when the query is empty.
pub async fn materialize_one<T: FromRow + Default>(
    mut rows: RowStream<'_>,
    cx: &MaterializeCx<'_>,
) -> Result<T> {
    match first_row(&mut rows, cx).await? {
        Some(row) => {
            let item = T::from_row(&row)?;
            intercept(cx, 0, &item)?;
            Ok(item)
        }
        None => Ok(T::default()),
    }
}

/// Materialise every row up to the row cap.
pub async fn materialize_rows<T: FromRow>(
    mut rows: RowStream<'_>,
    cx: &MaterializeCx<'_>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    let mut index = 0usize;
    loop {
        if cx.max_rows >= 0 && index as i64 >= cx.max_rows {
            break;
        }
        let Some(row) = rows.next().await else {
            break;
        };
        let row = row.map_err(|e| cx.wrap(e))?;
        let item = T::from_row(&row)?;
        if !intercept(cx, index, &item)? {
            out.push(item);
            return Ok(out);
        }
        out.push(item);
        index += 1;
    }
    Ok(out)
}

impl Outcome for () {
    const KIND: OutKind = OutKind::Unit;

    fn from_affected(_affected: RowsAffected) -> Result<Self> {
        Ok(())
    }

    async fn materialize(_rows: RowStream<'_>, _cx: &MaterializeCx<'_>) -> Result<Self> {
        Ok(())
    }
}

impl Outcome for RowsAffected {
    const KIND: OutKind = OutKind::Affected;

    fn from_affected(affected: RowsAffected) -> Result<Self> {
        Ok(affected)
    }

    async fn materialize(_rows: RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Self> {
        Err(Error::shape(cx.id, "RowsAffected needs a mutation statement"))
    }
}

/// Marker for scalar result kinds usable in positional output tuples.
pub trait ScalarOut: AsValue + Send + 'static {}

macro_rules! impl_scalar_outcome {
    ($ty:ty) => {
        impl ScalarOut for $ty {}

        impl FromRow for $ty {
            fn from_row(row: &RowLabeled) -> Result<Self> {
                scan_col(row, 0)
            }
        }

        impl Outcome for $ty {
            const KIND: OutKind = OutKind::Scalar;

            fn from_affected(affected: RowsAffected) -> Result<Self> {
                <$ty as AsValue>::try_from_value(Value::UInt64(Some(affected.rows_affected)))
            }

            async fn materialize(
                mut rows: RowStream<'_>,
                cx: &MaterializeCx<'_>,
            ) -> Result<Self> {
                match first_row(&mut rows, cx).await? {
                    Some(row) => scan_col(&row, 0),
                    None => Err(Error::NoRows),
                }
            }
        }
    };
}

// The raw-driver-value shape: a declared `Value` receives whatever the
// driver produced, NULLs included.
impl FromRow for Value {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(row.values.first().cloned().unwrap_or(Value::Null))
    }
}

impl Outcome for Value {
    const KIND: OutKind = OutKind::Scalar;

    fn from_affected(affected: RowsAffected) -> Result<Self> {
        Ok(Value::UInt64(Some(affected.rows_affected)))
    }

    async fn materialize(mut rows: RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Self> {
        match first_row(&mut rows, cx).await? {
            Some(row) => Ok(row.values.first().cloned().unwrap_or(Value::Null)),
            None => Err(Error::NoRows),
        }
    }
}

impl_scalar_outcome!(bool);
impl_scalar_outcome!(i8);
impl_scalar_outcome!(i16);
impl_scalar_outcome!(i32);
impl_scalar_outcome!(i64);
impl_scalar_outcome!(u8);
impl_scalar_outcome!(u16);
impl_scalar_outcome!(u32);
impl_scalar_outcome!(u64);
impl_scalar_outcome!(f32);
impl_scalar_outcome!(f64);
impl_scalar_outcome!(String);

macro_rules! impl_tuple_outcome {
    ($($ty:ident : $idx:tt),+) => {
        impl<$($ty,)+> Outcome for ($($ty,)+)
        where
            $($ty: ScalarOut,)+
        {
            const KIND: OutKind = OutKind::Tuple;

            async fn materialize(
                mut rows: RowStream<'_>,
                cx: &MaterializeCx<'_>,
            ) -> Result<Self> {
                match first_row(&mut rows, cx).await? {
                    Some(row) => Ok(($(scan_col::<$ty>(&row, $idx)?,)+)),
                    None => Err(Error::NoRows),
                }
            }
        }
    };
}

impl_tuple_outcome!(T1: 0, T2: 1);
impl_tuple_outcome!(T1: 0, T2: 1, T3: 2);
impl_tuple_outcome!(T1: 0, T2: 1, T3: 2, T4: 3);

impl<T: FromRow> Outcome for Option<T> {
    const KIND: OutKind = OutKind::OptionalOne;

    async fn materialize(mut rows: RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Self> {
        match first_row(&mut rows, cx).await? {
            Some(row) => {
                let item = T::from_row(&row)?;
                intercept(cx, 0, &item)?;
                Ok(Some(item))
            }
            None => Err(Error::NoRows),
        }
    }
}

impl<T: FromRow> Outcome for Vec<T> {
    const KIND: OutKind = OutKind::Many;

    async fn materialize(rows: RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Self> {
        materialize_rows(rows, cx).await
    }
}

impl Outcome for HashMap<String, Value> {
    const KIND: OutKind = OutKind::One;

    async fn materialize(rows: RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Self> {
        materialize_one(rows, cx).await
    }
}

impl<T: FromRow> Outcome for Paged<T> {
    const KIND: OutKind = OutKind::Paged;

    async fn materialize(rows: RowStream<'_>, cx: &MaterializeCx<'_>) -> Result<Self> {
        let collected = materialize_rows(rows, cx).await?;
        let (count_sql, dropped) = crate::paging::count_sql(cx.id, cx.sql)?;
        let keep = cx.params.len().saturating_sub(dropped);
        let count_sql = crate::dialect::rewrite_markers(&count_sql, cx.dialect);
        let mut stream = cx.driver.query(&count_sql, &cx.params[..keep]);
        let total = match first_row(&mut stream, cx).await? {
            Some(row) => scan_col(&row, 0)?,
            None => 0,
        };
        Ok(Paged {
            rows: collected,
            total,
        })
    }
}
