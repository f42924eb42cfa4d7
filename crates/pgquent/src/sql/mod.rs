//! Statement rendering.
//!
//! [`SqlBuilder`] turns a [`Binding`](crate::Binding) and a [`ModelMeta`](crate::ModelMeta)
//! into SQL text with `:name` placeholders. [`named::compile`] then rewrites that text to
//! PostgreSQL's positional `$n` form, pulling values out of a [`Params`] map.
//!
//! Placeholder names come from each condition's position and column, so the same column
//! can appear in several conditions of one statement:
//!
//! | condition              | placeholders                     |
//! |------------------------|----------------------------------|
//! | `0`: `name ILIKE ..`   | `:0name`                         |
//! | `1`: `id IN (..)`      | `:1id_in_0`, `:1id_in_1`, ...    |
//! | `2`: `id BETWEEN ..`   | `:2id0`, `:2id1`                 |

mod builder;
pub mod named;
mod params;

pub use builder::{SqlBuilder, qualified};
pub use named::{CompiledSql, compile};
pub use params::Params;
