//! Convenient imports for typical `pgquent` usage.
//!
//! ```ignore
//! use pgquent::prelude::*;
//! ```

pub use crate::{
    Compare, Condition, DbConfig, Direction, FromRow, GenericClient, Model, OrmError, OrmResult,
    Page, Params, Query, RowExt, Schema, Timestamps, Value, params,
};

pub use crate::{MigrateOptions, Migration, migrate};
