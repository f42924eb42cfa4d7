//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// Trait for types that can be constructed from a database row.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `pgquent-derive` crate.
///
/// # Example
///
/// ```ignore
/// use pgquent::FromRow;
///
/// #[derive(FromRow)]
/// struct Genre {
///     id: i32,
///     name: String,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Whether the row carries a column with this name.
    fn has_column(&self, column: &str) -> bool;

    /// Read a timestamp column as UTC, accepting both `TIMESTAMP` and `TIMESTAMPTZ`.
    ///
    /// A missing column and a NULL value both decode to `None`.
    fn try_get_instant(&self, column: &str) -> OrmResult<Option<DateTime<Utc>>>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|c| c.name() == column)
    }

    fn try_get_instant(&self, column: &str) -> OrmResult<Option<DateTime<Utc>>> {
        let Some(col) = self.columns().iter().find(|c| c.name() == column) else {
            return Ok(None);
        };
        if *col.type_() == Type::TIMESTAMP {
            let naive: Option<NaiveDateTime> = self.try_get_column(column)?;
            Ok(naive.map(|v| v.and_utc()))
        } else {
            self.try_get_column(column)
        }
    }
}
