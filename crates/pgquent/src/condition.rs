//! WHERE predicates.
//!
//! [`Op`] carries its own operands, so the operand shape of every operator is fixed by
//! the variant: `IS NULL` has none, `BETWEEN` has exactly two, `IN` has a list and a
//! column comparison names another column.

use crate::error::{OrmError, OrmResult};
use crate::ident::check_ident;
use crate::sql::Params;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// How a condition joins the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Binary comparison operator.
///
/// Parses from its SQL spelling:
///
/// ```ignore
/// let op: Compare = "ILIKE".parse()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    NotLike,
    NotIlike,
}

impl Compare {
    pub fn as_sql(self) -> &'static str {
        match self {
            Compare::Eq => "=",
            Compare::Ne => "!=",
            Compare::Gt => ">",
            Compare::Gte => ">=",
            Compare::Lt => "<",
            Compare::Lte => "<=",
            Compare::Like => "LIKE",
            Compare::Ilike => "ILIKE",
            Compare::NotLike => "NOT LIKE",
            Compare::NotIlike => "NOT ILIKE",
        }
    }
}

impl fmt::Display for Compare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Compare {
    type Err = OrmError;

    fn from_str(s: &str) -> OrmResult<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "=" => Ok(Compare::Eq),
            "!=" | "<>" => Ok(Compare::Ne),
            ">" => Ok(Compare::Gt),
            ">=" => Ok(Compare::Gte),
            "<" => Ok(Compare::Lt),
            "<=" => Ok(Compare::Lte),
            "LIKE" => Ok(Compare::Like),
            "ILIKE" => Ok(Compare::Ilike),
            "NOT LIKE" => Ok(Compare::NotLike),
            "NOT ILIKE" => Ok(Compare::NotIlike),
            _ => Err(OrmError::validation(format!("unknown operator '{s}'"))),
        }
    }
}

/// Operator together with its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// column <cmp> value
    Compare(Compare, Value),
    IsNull,
    IsNotNull,
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Between(Value, Value),
    NotBetween(Value, Value),
    /// column <cmp> other_column
    Column(Compare, String),
}

impl Op {
    pub fn eq(value: impl Into<Value>) -> Self {
        Op::Compare(Compare::Eq, value.into())
    }

    pub fn ne(value: impl Into<Value>) -> Self {
        Op::Compare(Compare::Ne, value.into())
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Op::Compare(Compare::Gt, value.into())
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Op::Compare(Compare::Gte, value.into())
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Op::Compare(Compare::Lt, value.into())
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Op::Compare(Compare::Lte, value.into())
    }

    pub fn like(pattern: impl Into<Value>) -> Self {
        Op::Compare(Compare::Like, pattern.into())
    }

    pub fn ilike(pattern: impl Into<Value>) -> Self {
        Op::Compare(Compare::Ilike, pattern.into())
    }

    pub fn in_list(values: impl Into<Value>) -> Self {
        Op::In(values.into().into_list())
    }

    pub fn not_in(values: impl Into<Value>) -> Self {
        Op::NotIn(values.into().into_list())
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::Between(from.into(), to.into())
    }

    pub fn not_between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::NotBetween(from.into(), to.into())
    }

    /// SQL keyword(s) placed between the two sides.
    pub fn keyword(&self) -> &'static str {
        match self {
            Op::Compare(cmp, _) | Op::Column(cmp, _) => cmp.as_sql(),
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
            Op::In(_) => "IN",
            Op::NotIn(_) => "NOT IN",
            Op::Between(..) => "BETWEEN",
            Op::NotBetween(..) => "NOT BETWEEN",
        }
    }
}

/// One WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub connector: Connector,
    pub column: String,
    pub op: Op,
}

impl Condition {
    pub fn new(connector: Connector, column: impl Into<String>, op: Op) -> Self {
        Self {
            connector,
            column: column.into(),
            op,
        }
    }

    pub fn and(column: impl Into<String>, op: Op) -> Self {
        Self::new(Connector::And, column, op)
    }

    pub fn or(column: impl Into<String>, op: Op) -> Self {
        Self::new(Connector::Or, column, op)
    }

    /// Placeholder stem for the condition at `index`: `{index}{column}`.
    ///
    /// Column names never start with a digit, so stems of different positions cannot collide.
    pub fn stem(&self, index: usize) -> String {
        format!("{index}{}", self.column)
    }

    /// Placeholder name of the `k`-th `IN` element.
    pub fn list_key(&self, index: usize, k: usize) -> String {
        format!("{}_in_{k}", self.stem(index))
    }

    /// Placeholder name of a `BETWEEN` bound (`k` is 0 or 1).
    pub fn range_key(&self, index: usize, k: usize) -> String {
        format!("{}{k}", self.stem(index))
    }

    /// Add this condition's values to `params` under its placeholder names.
    ///
    /// Null checks and column comparisons bind nothing.
    pub fn bind(&self, index: usize, params: &mut Params) {
        match &self.op {
            Op::Compare(_, value) => {
                params.insert(self.stem(index), value.clone());
            }
            Op::In(values) | Op::NotIn(values) => {
                for (k, value) in values.iter().enumerate() {
                    params.insert(self.list_key(index, k), value.clone());
                }
            }
            Op::Between(from, to) | Op::NotBetween(from, to) => {
                params.insert(self.range_key(index, 0), from.clone());
                params.insert(self.range_key(index, 1), to.clone());
            }
            Op::IsNull | Op::IsNotNull | Op::Column(..) => {}
        }
    }

    /// Check identifiers and operand shapes before rendering.
    pub fn validate(&self) -> OrmResult<()> {
        check_ident(&self.column, "condition column")?;
        match &self.op {
            Op::Compare(_, Value::List(_)) => Err(OrmError::validation(format!(
                "column '{}': use where_in for list values",
                self.column
            ))),
            Op::In(values) | Op::NotIn(values) if values.is_empty() => Err(
                OrmError::validation(format!("column '{}': IN list is empty", self.column)),
            ),
            Op::In(values) | Op::NotIn(values) => {
                if values.iter().any(|v| matches!(v, Value::List(_))) {
                    return Err(OrmError::validation(format!(
                        "column '{}': nested list in IN",
                        self.column
                    )));
                }
                Ok(())
            }
            Op::Between(from, to) | Op::NotBetween(from, to) => {
                if matches!(from, Value::List(_)) || matches!(to, Value::List(_)) {
                    return Err(OrmError::validation(format!(
                        "column '{}': BETWEEN bounds must be scalars",
                        self.column
                    )));
                }
                Ok(())
            }
            Op::Column(_, other) => check_ident(other, "compared column"),
            Op::Compare(..) | Op::IsNull | Op::IsNotNull => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_parses_sql_spelling() {
        assert_eq!("=".parse::<Compare>().unwrap(), Compare::Eq);
        assert_eq!("<>".parse::<Compare>().unwrap(), Compare::Ne);
        assert_eq!("ilike".parse::<Compare>().unwrap(), Compare::Ilike);
        assert_eq!("not   like".parse::<Compare>().unwrap(), Compare::NotLike);
        assert!("~~".parse::<Compare>().is_err());
    }

    #[test]
    fn keywords() {
        assert_eq!(Op::eq(1).keyword(), "=");
        assert_eq!(Op::not_in(vec![1]).keyword(), "NOT IN");
        assert_eq!(Op::between(1, 2).keyword(), "BETWEEN");
        assert_eq!(Op::IsNotNull.keyword(), "IS NOT NULL");
        assert_eq!(Op::Column(Compare::Lt, "b".into()).keyword(), "<");
    }

    #[test]
    fn bind_expands_lists_and_ranges() {
        let mut params = Params::new();
        Condition::and("status", Op::in_list(vec!["a", "b"])).bind(0, &mut params);
        Condition::or("id", Op::between(1, 9)).bind(1, &mut params);
        Condition::and("name", Op::eq("x")).bind(2, &mut params);
        Condition::and("deleted_at", Op::IsNull).bind(3, &mut params);
        Condition::and("a", Op::Column(Compare::Eq, "b".into())).bind(4, &mut params);

        let keys: Vec<_> = params.keys().collect();
        assert_eq!(
            keys,
            ["0status_in_0", "0status_in_1", "1id0", "1id1", "2name"]
        );
        assert_eq!(params.get("1id1"), Some(&Value::Int(9)));
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert!(Condition::and("id", Op::In(vec![])).validate().is_err());
        assert!(Condition::and("id", Op::eq(vec![1, 2])).validate().is_err());
        assert!(Condition::and("bad col", Op::IsNull).validate().is_err());
        assert!(
            Condition::and("a", Op::Column(Compare::Eq, "b; --".into()))
                .validate()
                .is_err()
        );
        assert!(Condition::and("id", Op::in_list([1, 2])).validate().is_ok());
    }
}
