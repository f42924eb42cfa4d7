//! Table blueprints.
//!
//! A [`Schema`] describes one DDL operation on one table. It is built through a callback
//! that declares columns, keys and indexes, and is rendered by [`crate::ddl`].
//!
//! ```ignore
//! use pgquent::Schema;
//!
//! let genres = Schema::create("genres", |t| {
//!     t.serial("id").auto_increment();
//!     t.string("name").unique();
//!     t.index(["id", "name"]);
//! })?;
//! ```

mod column;
mod reference;

pub use column::{Column, DataType};
pub use reference::{Reference, ReferenceAction};

use crate::error::{OrmError, OrmResult};
use crate::ident::check_ident;
use crate::model::{CREATED_AT, DELETED_AT, UPDATED_AT};
use std::fmt;

/// DDL operation a [`Schema`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create,
    Alter,
    Drop,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Create => "CREATE",
            Command::Alter => "ALTER",
            Command::Drop => "DROP",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blueprint of one table operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    command: Command,
    table: String,
    columns: Vec<Column>,
    renames: Vec<Column>,
    drops: Vec<String>,
    primary: Vec<String>,
    references: Vec<Reference>,
    unique: Vec<String>,
    indexes: Vec<String>,
}

macro_rules! column_methods {
    ($($(#[$doc:meta])* $method:ident => $ty:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, name: impl Into<String>) -> &mut Column {
                self.column(name, DataType::$ty)
            }
        )*
    };
}

impl Schema {
    fn empty(command: Command, table: impl Into<String>) -> Self {
        Self {
            command,
            table: table.into(),
            columns: Vec::new(),
            renames: Vec::new(),
            drops: Vec::new(),
            primary: Vec::new(),
            references: Vec::new(),
            unique: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Blueprint for `CREATE TABLE`. At least one column must be declared.
    pub fn create(table: impl Into<String>, build: impl FnOnce(&mut Schema)) -> OrmResult<Self> {
        let mut schema = Self::empty(Command::Create, table);
        build(&mut schema);
        schema.validate()?;
        Ok(schema)
    }

    /// Blueprint for `ALTER TABLE`.
    pub fn table(table: impl Into<String>, build: impl FnOnce(&mut Schema)) -> OrmResult<Self> {
        let mut schema = Self::empty(Command::Alter, table);
        build(&mut schema);
        schema.validate()?;
        Ok(schema)
    }

    /// Blueprint for `DROP TABLE`.
    pub fn drop_table(table: impl Into<String>) -> OrmResult<Self> {
        let schema = Self::empty(Command::Drop, table);
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> OrmResult<()> {
        check_ident(&self.table, "table name")?;
        if self.command == Command::Create && self.columns.is_empty() {
            return Err(OrmError::config(format!(
                "CREATE TABLE {} declares no columns",
                self.table
            )));
        }
        for col in &self.columns {
            check_ident(&col.name, "column name")?;
        }
        for col in &self.renames {
            check_ident(&col.name, "column name")?;
            if let Some(prev) = &col.previous_name {
                check_ident(prev, "column name")?;
            }
        }
        for name in self
            .drops
            .iter()
            .chain(&self.primary)
            .chain(&self.unique)
            .chain(&self.indexes)
        {
            check_ident(name, "column name")?;
        }
        for fk in &self.references {
            check_ident(&fk.column, "foreign key column")?;
            check_ident(&fk.table, "referenced table")?;
            check_ident(&fk.target, "referenced column")?;
        }
        Ok(())
    }

    /// Declare a column of an explicit type.
    pub fn column(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Column {
        let idx = self.columns.len();
        self.columns.push(Column::new(name, data_type));
        &mut self.columns[idx]
    }

    column_methods! {
        small_integer => SmallInt,
        integer => Integer,
        big_integer => BigInt,
        decimal => Decimal,
        numeric => Numeric,
        real => Real,
        double => Double,
        small_serial => SmallSerial,
        serial => Serial,
        big_serial => BigSerial,
        /// `VARCHAR` column.
        string => Varchar,
        text => Text,
        uuid => Uuid,
        json => Json,
        boolean => Boolean,
        date => Date,
        time => Time,
        /// `TIMESTAMP` column.
        date_time => Timestamp,
        /// `TIMESTAMPTZ` column.
        date_time_tz => TimestampTz,
    }

    /// Rename an existing column.
    pub fn rename(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.renames.push(Column::renamed(from, to));
        self
    }

    /// Queue columns for removal.
    pub fn drop_columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drops.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Declare a foreign key on `column`.
    pub fn foreign(&mut self, column: impl Into<String>) -> &mut Reference {
        let idx = self.references.len();
        self.references.push(Reference::new(column));
        &mut self.references[idx]
    }

    /// Table-level `PRIMARY KEY(...)`.
    pub fn primary<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Table-level `UNIQUE(...)`.
    pub fn unique<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Columns covered by the table's `<table>_indexes` index.
    pub fn index<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add `created_at` and `updated_at` as `TIMESTAMP`.
    pub fn timestamp(&mut self) -> &mut Self {
        self.column(CREATED_AT, DataType::Timestamp);
        self.column(UPDATED_AT, DataType::Timestamp);
        self
    }

    /// Add `created_at` and `updated_at` as `TIMESTAMPTZ`.
    pub fn timestamp_tz(&mut self) -> &mut Self {
        self.column(CREATED_AT, DataType::TimestampTz);
        self.column(UPDATED_AT, DataType::TimestampTz);
        self
    }

    /// Add `deleted_at` as `TIMESTAMP`.
    pub fn soft_delete(&mut self) -> &mut Self {
        self.column(DELETED_AT, DataType::Timestamp);
        self
    }

    /// Add `deleted_at` as `TIMESTAMPTZ`.
    pub fn soft_delete_tz(&mut self) -> &mut Self {
        self.column(DELETED_AT, DataType::TimestampTz);
        self
    }

    pub fn drop_timestamp(&mut self) -> &mut Self {
        self.drop_columns([CREATED_AT, UPDATED_AT])
    }

    pub fn drop_soft_delete(&mut self) -> &mut Self {
        self.drop_columns([DELETED_AT])
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn renames(&self) -> &[Column] {
        &self.renames
    }

    pub fn drops(&self) -> &[String] {
        &self.drops
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary
    }

    pub fn unique_keys(&self) -> &[String] {
        &self.unique
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    /// Render this blueprint's DDL.
    pub fn to_sql(&self) -> String {
        crate::ddl::render(self)
    }
}
