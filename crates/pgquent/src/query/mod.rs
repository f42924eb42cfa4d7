//! Fluent query façade.
//!
//! A [`Query`] borrows a client and accumulates clauses for one model. Clause methods
//! mutate its [`Binding`] and return `&mut Self`; terminal operations (see `exec.rs`)
//! render, execute and reset it.
//!
//! ```ignore
//! use pgquent::{Compare, Direction, Query};
//!
//! let mut q = Query::<Genre, _>::new(&client);
//! let genres = q
//!     .and_where("name", Compare::Ilike, "%bulk%")
//!     .or_where("id", Compare::Eq, 1)
//!     .order_by(Direction::Desc, ["id"])
//!     .take(10)
//!     .get()
//!     .await?;
//! ```
//!
//! A `Query` is not meant to be shared between concurrent tasks: use one per call
//! sequence (or per transaction).

mod exec;
mod transaction;

pub use exec::{DEFAULT_PER_PAGE, MAX_BIND_PARAMS, Page};

use crate::binding::{Binding, Direction, Order};
use crate::client::GenericClient;
use crate::condition::{Compare, Condition, Connector, Op};
use crate::log::SqlLogger;
use crate::model::Model;
use crate::sql::SqlBuilder;
use crate::value::Value;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    Active,
    /// Committed or rolled back, waiting for `end_transaction`.
    Finished,
}

/// Clause accumulator and statement executor for model `M`.
pub struct Query<'c, M, C: GenericClient = tokio_postgres::Client> {
    client: &'c C,
    builder: SqlBuilder,
    binding: Binding,
    tx: TxState,
    logger: SqlLogger,
    _model: PhantomData<fn() -> M>,
}

impl<'c, M: Model, C: GenericClient> Query<'c, M, C> {
    pub fn new(client: &'c C) -> Self {
        Self {
            client,
            builder: SqlBuilder::new(),
            binding: Binding::new(),
            tx: TxState::Idle,
            logger: SqlLogger::default(),
            _model: PhantomData,
        }
    }

    /// Replace the statement logger.
    pub fn with_logger(mut self, logger: SqlLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Switch to another model on the same connection, keeping an open transaction.
    ///
    /// Pending clauses are discarded.
    pub fn using<N: Model>(mut self) -> Query<'c, N, C> {
        let tx = std::mem::replace(&mut self.tx, TxState::Idle);
        Query {
            client: self.client,
            builder: self.builder,
            binding: Binding::new(),
            tx,
            logger: self.logger.clone(),
            _model: PhantomData,
        }
    }

    pub fn client(&self) -> &'c C {
        self.client
    }

    /// Pending clause state.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// SQL of the pending `SELECT`, with named placeholders. Does not reset anything.
    pub fn to_sql(&self) -> String {
        self.builder.select(&M::META, &self.binding)
    }

    fn push(&mut self, connector: Connector, column: impl Into<String>, op: Op) -> &mut Self {
        self.binding
            .conditions
            .push(Condition::new(connector, column, op));
        self
    }

    /// Append a prepared condition.
    pub fn filter(&mut self, condition: Condition) -> &mut Self {
        self.binding.conditions.push(condition);
        self
    }

    /// `AND column <cmp> value`
    pub fn and_where(
        &mut self,
        column: impl Into<String>,
        cmp: Compare,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::And, column, Op::Compare(cmp, value.into()))
    }

    /// `OR column <cmp> value`
    pub fn or_where(
        &mut self,
        column: impl Into<String>,
        cmp: Compare,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::Or, column, Op::Compare(cmp, value.into()))
    }

    /// `AND column IN (...)`
    pub fn where_in(&mut self, column: impl Into<String>, values: impl Into<Value>) -> &mut Self {
        self.push(Connector::And, column, Op::in_list(values))
    }

    pub fn or_where_in(
        &mut self,
        column: impl Into<String>,
        values: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::Or, column, Op::in_list(values))
    }

    /// `AND column NOT IN (...)`
    pub fn except(&mut self, column: impl Into<String>, values: impl Into<Value>) -> &mut Self {
        self.push(Connector::And, column, Op::not_in(values))
    }

    pub fn or_except(&mut self, column: impl Into<String>, values: impl Into<Value>) -> &mut Self {
        self.push(Connector::Or, column, Op::not_in(values))
    }

    pub fn where_between(
        &mut self,
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::And, column, Op::between(from, to))
    }

    pub fn or_where_between(
        &mut self,
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::Or, column, Op::between(from, to))
    }

    pub fn where_not_between(
        &mut self,
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::And, column, Op::not_between(from, to))
    }

    pub fn or_where_not_between(
        &mut self,
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> &mut Self {
        self.push(Connector::Or, column, Op::not_between(from, to))
    }

    pub fn where_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.push(Connector::And, column, Op::IsNull)
    }

    pub fn or_where_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.push(Connector::Or, column, Op::IsNull)
    }

    pub fn where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.push(Connector::And, column, Op::IsNotNull)
    }

    pub fn or_where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.push(Connector::Or, column, Op::IsNotNull)
    }

    /// `AND column <cmp> other_column`
    pub fn where_column(
        &mut self,
        column: impl Into<String>,
        cmp: Compare,
        other: impl Into<String>,
    ) -> &mut Self {
        self.push(Connector::And, column, Op::Column(cmp, other.into()))
    }

    pub fn or_where_column(
        &mut self,
        column: impl Into<String>,
        cmp: Compare,
        other: impl Into<String>,
    ) -> &mut Self {
        self.push(Connector::Or, column, Op::Column(cmp, other.into()))
    }

    pub fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binding
            .group_by
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by<I, S>(&mut self, direction: Direction, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binding.order.push(Order {
            columns: columns.into_iter().map(Into::into).collect(),
            direction,
        });
        self
    }

    /// `OFFSET n`
    pub fn skip(&mut self, n: u64) -> &mut Self {
        self.binding.offset = n;
        self
    }

    /// `LIMIT n`
    pub fn take(&mut self, n: u64) -> &mut Self {
        self.binding.limit = n;
        self
    }
}
