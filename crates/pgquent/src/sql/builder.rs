use crate::binding::{Aggregate, Binding};
use crate::condition::{Condition, Op};
use crate::ident::quote_ident;
use crate::model::{DELETED_AT, ModelMeta};

/// `"table"."column"`, or `"table".*` for the `*` column.
pub fn qualified(table: &str, column: &str) -> String {
    if column == "*" {
        format!("{}.*", quote_ident(table))
    } else {
        format!("{}.{}", quote_ident(table), quote_ident(column))
    }
}

/// Renders statements with `:name` placeholders.
///
/// Stateless; one value can be shared freely between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBuilder;

impl SqlBuilder {
    pub fn new() -> Self {
        SqlBuilder
    }

    /// `SELECT` for a model, honoring every clause of the binding.
    pub fn select(&self, meta: &ModelMeta, binding: &Binding) -> String {
        let table = meta.table;
        let projection = match &binding.aggregate {
            Some(agg) => self.aggregate(table, agg),
            None => meta
                .select_columns()
                .iter()
                .map(|c| qualified(table, c))
                .collect::<Vec<_>>()
                .join(", "),
        };

        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(table));
        if !binding.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clause(table, &binding.conditions));
        }
        if !binding.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&qualified_list(table, &binding.group_by));
        }
        if !binding.order.is_empty() {
            let terms: Vec<String> = binding
                .order
                .iter()
                .map(|o| format!("{} {}", qualified_list(table, &o.columns), o.direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if binding.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", binding.limit));
        }
        if binding.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", binding.offset));
        }
        sql
    }

    /// `FUNC("table"."column")`, or `FUNC("table".*)` for the `*` column.
    pub fn aggregate(&self, table: &str, agg: &Aggregate) -> String {
        format!("{}({})", agg.func.as_sql(), qualified(table, &agg.column))
    }

    /// Body of a WHERE clause (without the keyword).
    ///
    /// The connector of the first condition is not rendered.
    pub fn where_clause(&self, table: &str, conditions: &[Condition]) -> String {
        let mut sql = String::new();
        for (i, cond) in conditions.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(cond.connector.as_sql());
                sql.push(' ');
            }
            sql.push_str(&qualified(table, &cond.column));
            sql.push(' ');
            sql.push_str(cond.op.keyword());
            match &cond.op {
                Op::Compare(..) => {
                    sql.push_str(&format!(" :{}", cond.stem(i)));
                }
                Op::In(values) | Op::NotIn(values) => {
                    if values.is_empty() {
                        sql.push_str(" (NULL)");
                    } else {
                        let names: Vec<String> = (0..values.len())
                            .map(|k| format!(":{}", cond.list_key(i, k)))
                            .collect();
                        sql.push_str(&format!(" ({})", names.join(", ")));
                    }
                }
                Op::Between(..) | Op::NotBetween(..) => {
                    sql.push_str(&format!(
                        " :{} AND :{}",
                        cond.range_key(i, 0),
                        cond.range_key(i, 1)
                    ));
                }
                Op::Column(_, other) => {
                    sql.push(' ');
                    sql.push_str(&qualified(table, other));
                }
                Op::IsNull | Op::IsNotNull => {}
            }
        }
        sql
    }

    /// `INSERT ... RETURNING`; values are read from placeholders named after the columns.
    pub fn insert(&self, meta: &ModelMeta, returning: &[&str]) -> String {
        let columns = meta.insert_columns();
        if columns.is_empty() {
            return format!(
                "INSERT INTO {} DEFAULT VALUES{}",
                meta.table,
                returning_clause(returning)
            );
        }
        format!(
            "INSERT INTO {} ({}) VALUES {}{}",
            meta.table,
            quoted_list(&columns),
            values_tuple(&columns, ""),
            returning_clause(returning)
        )
    }

    /// Multi-row `INSERT`; placeholders of tuple `i` are prefixed with `i`.
    pub fn bulk_insert(&self, meta: &ModelMeta, rows: usize, returning: &[&str]) -> String {
        let columns = meta.insert_columns();
        let tuples: Vec<String> = (0..rows)
            .map(|i| values_tuple(&columns, &i.to_string()))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES {}{}",
            meta.table,
            quoted_list(&columns),
            tuples.join(", "),
            returning_clause(returning)
        )
    }

    /// `UPDATE` of the declared non-key columns plus `updated_at`, by primary key.
    pub fn update(&self, meta: &ModelMeta) -> String {
        let sets: Vec<String> = meta
            .update_columns()
            .iter()
            .map(|c| format!("{}=:{c}", quote_ident(c)))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {}",
            meta.table,
            sets.join(", "),
            key_predicate(meta)
        )
    }

    /// `DELETE` by primary key.
    pub fn delete(&self, meta: &ModelMeta) -> String {
        format!("DELETE FROM {} WHERE {}", meta.table, key_predicate(meta))
    }

    /// `DELETE` of every row matching `conditions`.
    pub fn delete_where(&self, meta: &ModelMeta, conditions: &[Condition]) -> String {
        format!(
            "DELETE FROM {}{}",
            meta.table,
            self.optional_where(meta.table, conditions)
        )
    }

    /// Soft delete by primary key: sets `deleted_at`.
    pub fn soft_delete(&self, meta: &ModelMeta) -> String {
        format!(
            "UPDATE {} SET {}=:{DELETED_AT} WHERE {}",
            meta.table,
            quote_ident(DELETED_AT),
            key_predicate(meta)
        )
    }

    /// Soft delete of every row matching `conditions`.
    pub fn soft_delete_where(&self, meta: &ModelMeta, conditions: &[Condition]) -> String {
        format!(
            "UPDATE {} SET {}=:{DELETED_AT}{}",
            meta.table,
            quote_ident(DELETED_AT),
            self.optional_where(meta.table, conditions)
        )
    }

    fn optional_where(&self, table: &str, conditions: &[Condition]) -> String {
        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clause(table, conditions))
        }
    }
}

fn key_predicate(meta: &ModelMeta) -> String {
    format!("{}=:{}", quote_ident(meta.primary_key), meta.primary_key)
}

fn quoted_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn qualified_list(table: &str, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| qualified(table, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn values_tuple(columns: &[&str], prefix: &str) -> String {
    let names: Vec<String> = columns.iter().map(|c| format!(":{prefix}{c}")).collect();
    format!("({})", names.join(", "))
}

fn returning_clause(returning: &[&str]) -> String {
    match returning {
        [] => String::new(),
        cols if cols.contains(&"*") => " RETURNING *".to_string(),
        cols => format!(" RETURNING {}", quoted_list(cols)),
    }
}
