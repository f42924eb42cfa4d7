//! # pgquent
//!
//! A small Postgres ORM: declarative table blueprints and migrations, plus a fluent query
//! façade that renders parameterized SQL for typed models.
//!
//! ## Features
//!
//! - **Blueprints**: describe CREATE / ALTER / DROP with [`Schema`] and render DDL
//! - **Migrations**: batches applied in transactions and recorded in a ledger table
//! - **Query façade**: chain clauses on a [`Query`], then `get`, `first`, `paginate`, ...
//! - **Safe SQL**: identifiers are validated, values are always bound as parameters
//! - **Transaction-friendly**: run a query on a connection or on a `tokio_postgres::Transaction`
//!
//! ## Example
//!
//! ```ignore
//! use pgquent::prelude::*;
//!
//! #[derive(Debug, Clone, Model, FromRow)]
//! #[orm(table = "genres", auto_increment, timestamps)]
//! struct Genre {
//!     #[orm(id)]
//!     id: i32,
//!     name: String,
//!     #[orm(meta)]
//!     meta: Timestamps,
//! }
//!
//! let client = DbConfig::from_env()?.connect().await?;
//! let mut genres = Query::<Genre>::new(&client);
//!
//! let mut drama = Genre { id: 0, name: "drama".into(), meta: Timestamps::default() };
//! genres.insert(&mut drama).await?;
//!
//! let page = genres
//!     .and_where("name", Compare::Ilike, "%dr%")
//!     .order_by(Direction::Desc, ["id"])
//!     .paginate(1, 20)
//!     .await?;
//! ```

pub mod binding;
pub mod client;
pub mod condition;
pub mod config;
pub mod ddl;
pub mod error;
pub mod ident;
pub mod log;
pub mod migrate;
pub mod model;
pub mod prelude;
pub mod query;
pub mod row;
pub mod schema;
pub mod seed;
pub mod sql;
pub mod value;

pub use binding::{Aggregate, AggregateFn, Binding, Direction, Order};
pub use client::GenericClient;
pub use condition::{Compare, Condition, Connector, Op};
pub use config::DbConfig;
pub use error::{OrmError, OrmResult};
pub use log::{SqlLogger, StatementKind};
pub use migrate::{AppliedMigration, MigrateOptions, Migration, MigrationReport, migrate};
pub use model::{Model, ModelMeta, Timestamps};
pub use query::{Page, Query};
pub use row::{FromRow, RowExt};
pub use schema::{Column, Command, DataType, Reference, ReferenceAction, Schema};
pub use seed::{Seeder, seed};
pub use sql::{CompiledSql, Params, SqlBuilder};
pub use value::Value;

// Generated code names row types through this path.
pub use tokio_postgres;

#[cfg(feature = "derive")]
pub use pgquent_derive::{FromRow, Model};
