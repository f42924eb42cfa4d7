//! Derive macros for pgquent
//!
//! Provides `#[derive(Model)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_row;
mod model;
mod sql_ident;

/// Derive `FromRow` for a struct.
///
/// # Example
///
/// ```ignore
/// use pgquent::FromRow;
///
/// #[derive(FromRow)]
/// struct Genre {
///     id: i32,
///     #[orm(column = "genre_name")]
///     name: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(meta)]` - `Timestamps` field, decoded from the bookkeeping columns
/// - `#[orm(skip)]` - Not read from the row; filled with `Default::default()`
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `Model` for a struct.
///
/// # Example
///
/// ```ignore
/// use pgquent::{FromRow, Model, Timestamps};
///
/// #[derive(Model, FromRow)]
/// #[orm(table = "books", auto_increment, timestamps, soft_delete)]
/// struct Book {
///     #[orm(id)]
///     id: i64,
///     title: String,
///     #[orm(meta)]
///     meta: Timestamps,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `table = "name"` - Table name (defaults to the snake_case struct name)
/// - `auto_increment` - The database generates the primary key
/// - `uuid` - The primary key is a UUID supplied by the application
/// - `timestamps` - Maintain `created_at` / `updated_at`
/// - `soft_delete` - Deletes set `deleted_at`
///
/// Field level:
/// - `id` - Primary key (defaults to a field named `id`)
/// - `column = "name"` - Map field to a different column name
/// - `meta` - The `Timestamps` field; required by `timestamps` and `soft_delete`
/// - `skip` - Not persisted
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
