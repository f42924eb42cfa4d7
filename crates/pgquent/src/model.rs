//! Model capability.
//!
//! A model is a record type mapped onto one table. Its [`ModelMeta`] is a `const`
//! descriptor, usually generated by `#[derive(Model)]`, so column lists are known at
//! compile time.

use crate::error::OrmResult;
use crate::row::{FromRow, RowExt};
use crate::sql::Params;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const DELETED_AT: &str = "deleted_at";

/// Static description of a model's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelMeta {
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Declared persisted columns, without timestamp bookkeeping columns.
    pub columns: &'static [&'static str],
    /// The database generates the primary key.
    pub auto_increment: bool,
    /// The primary key is a UUID supplied by the application.
    pub uuid: bool,
    /// Track `created_at` / `updated_at`.
    pub timestamps: bool,
    /// Deletes set `deleted_at` instead of removing rows.
    pub soft_delete: bool,
}

impl ModelMeta {
    /// Plain descriptor with every flag off.
    pub const fn new(
        table: &'static str,
        primary_key: &'static str,
        columns: &'static [&'static str],
    ) -> Self {
        Self {
            table,
            primary_key,
            columns,
            auto_increment: false,
            uuid: false,
            timestamps: false,
            soft_delete: false,
        }
    }

    /// Columns read by `SELECT`, including bookkeeping columns enabled by the flags.
    pub fn select_columns(&self) -> Vec<&'static str> {
        let mut cols = self.columns.to_vec();
        if self.timestamps {
            cols.extend([CREATED_AT, UPDATED_AT]);
        }
        if self.soft_delete {
            cols.push(DELETED_AT);
        }
        cols
    }

    /// Whether `INSERT` leaves the primary key to the database.
    pub fn generates_key(&self) -> bool {
        self.auto_increment && !self.uuid
    }

    pub fn insert_columns(&self) -> Vec<&'static str> {
        let mut cols = self.select_columns();
        if self.generates_key() {
            cols.retain(|c| *c != self.primary_key);
        }
        cols
    }

    /// Columns written by `UPDATE`: declared columns minus the key, plus `updated_at`.
    ///
    /// `created_at` and `deleted_at` are never rewritten by an update.
    pub fn update_columns(&self) -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = self
            .columns
            .iter()
            .copied()
            .filter(|c| *c != self.primary_key)
            .collect();
        if self.timestamps {
            cols.push(UPDATED_AT);
        }
        cols
    }
}

/// Embedded bookkeeping instants of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Overwrite the instants present in `row`; absent columns are left untouched.
    pub fn merge_row(&mut self, row: &Row) -> OrmResult<()> {
        for (column, slot) in [
            (CREATED_AT, &mut self.created_at),
            (UPDATED_AT, &mut self.updated_at),
            (DELETED_AT, &mut self.deleted_at),
        ] {
            if row.has_column(column) {
                *slot = row.try_get_instant(column)?;
            }
        }
        Ok(())
    }

    /// Write the instants enabled by `meta` into a payload.
    pub fn write_payload(&self, meta: &ModelMeta, params: &mut Params) {
        if meta.timestamps {
            params.insert(CREATED_AT, self.created_at);
            params.insert(UPDATED_AT, self.updated_at);
        }
        if meta.soft_delete {
            params.insert(DELETED_AT, self.deleted_at);
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl FromRow for Timestamps {
    fn from_row(row: &Row) -> OrmResult<Self> {
        let mut ts = Timestamps::default();
        ts.merge_row(row)?;
        Ok(ts)
    }
}

/// A record type persisted in one table.
///
/// Usually derived:
///
/// ```ignore
/// use pgquent::{FromRow, Model, Timestamps};
///
/// #[derive(Debug, Clone, Model, FromRow)]
/// #[orm(table = "genres", auto_increment, timestamps)]
/// struct Genre {
///     #[orm(id)]
///     id: i32,
///     name: String,
///     #[orm(meta)]
///     meta: Timestamps,
/// }
/// ```
pub trait Model: FromRow + Send + Sync {
    const META: ModelMeta;

    /// Column → value mapping of every column in [`ModelMeta::select_columns`].
    fn payload(&self) -> Params;

    /// Copy the columns present in a returned row (e.g. `RETURNING "id"`) into `self`.
    fn merge_row(&mut self, row: &Row) -> OrmResult<()>;

    fn timestamps(&self) -> Option<&Timestamps> {
        None
    }

    fn timestamps_mut(&mut self) -> Option<&mut Timestamps> {
        None
    }

    /// Stamp `created_at` and `updated_at` before an insert.
    fn touch_created(&mut self, now: DateTime<Utc>) {
        if Self::META.timestamps {
            if let Some(ts) = self.timestamps_mut() {
                ts.created_at = Some(now);
                ts.updated_at = Some(now);
            }
        }
    }

    /// Stamp `updated_at` before an update.
    fn touch_updated(&mut self, now: DateTime<Utc>) {
        if Self::META.timestamps {
            if let Some(ts) = self.timestamps_mut() {
                ts.updated_at = Some(now);
            }
        }
    }

    /// Stamp `deleted_at` before a soft delete.
    fn mark_deleted(&mut self, now: DateTime<Utc>) {
        if Self::META.soft_delete {
            if let Some(ts) = self.timestamps_mut() {
                ts.deleted_at = Some(now);
            }
        }
    }
}
