//! Per-statement clause accumulator.

use crate::condition::Condition;
use crate::error::OrmResult;
use crate::ident::check_ident;
use crate::sql::Params;
use std::fmt;

/// Aggregate function applied instead of the column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Max,
    Min,
    Avg,
    Sum,
}

impl AggregateFn {
    pub fn as_sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
            AggregateFn::Avg => "AVG",
            AggregateFn::Sum => "SUM",
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub func: AggregateFn,
    /// Target column, or `*`.
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub columns: Vec<String>,
    pub direction: Direction,
}

/// Clause state of one pending statement.
///
/// A [`Query`](crate::Query) takes its binding at the start of every terminal operation,
/// leaving an empty one behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    pub conditions: Vec<Condition>,
    pub aggregate: Option<Aggregate>,
    pub group_by: Vec<String>,
    pub order: Vec<Order>,
    /// `0` means no limit.
    pub limit: u64,
    /// `0` means no offset.
    pub offset: u64,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Named parameters of every condition, keyed by placeholder name.
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        for (i, cond) in self.conditions.iter().enumerate() {
            cond.bind(i, &mut params);
        }
        params
    }

    /// Validate identifiers and operand shapes before rendering.
    pub fn validate(&self) -> OrmResult<()> {
        for cond in &self.conditions {
            cond.validate()?;
        }
        if let Some(agg) = &self.aggregate {
            if agg.column != "*" {
                check_ident(&agg.column, "aggregate column")?;
            }
        }
        for col in &self.group_by {
            check_ident(col, "group by column")?;
        }
        for order in &self.order {
            for col in &order.columns {
                check_ident(col, "order by column")?;
            }
        }
        Ok(())
    }

    /// Copy of the filtering part only, for counting the rows a query matches.
    pub fn for_count(&self) -> Binding {
        Binding {
            conditions: self.conditions.clone(),
            aggregate: Some(Aggregate {
                func: AggregateFn::Count,
                column: "*".to_string(),
            }),
            ..Binding::default()
        }
    }
}
