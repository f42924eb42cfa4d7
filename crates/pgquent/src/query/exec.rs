//! Terminal operations: render the pending binding, execute it, reset it.

use super::Query;
use crate::binding::{Aggregate, AggregateFn, Binding};
use crate::client::GenericClient;
use crate::condition::{Condition, Op};
use crate::error::{OrmError, OrmResult};
use crate::ident::check_ident;
use crate::log::StatementKind;
use crate::model::{DELETED_AT, Model};
use crate::row::FromRow;
use crate::sql::{Params, compile};
use crate::value::Value;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tokio_postgres::Row;
use tokio_postgres::types::Type;

/// Page size used by `paginate` when `per_page` is 0.
pub const DEFAULT_PER_PAGE: u64 = 50;

/// Bind parameter limit of the PostgreSQL wire protocol.
pub const MAX_BIND_PARAMS: usize = 65535;

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<M> {
    pub data: Vec<M>,
    pub total: i64,
    pub page: u64,
    pub per_page: u64,
}

impl<M> Page<M> {
    /// Number of the last page (at least 1).
    pub fn last_page(&self) -> u64 {
        let total = u64::try_from(self.total).unwrap_or(0);
        total.div_ceil(self.per_page.max(1)).max(1)
    }

    pub fn has_more(&self) -> bool {
        self.page < self.last_page()
    }
}

impl<'c, M: Model, C: GenericClient> Query<'c, M, C> {
    fn take_binding(&mut self) -> Binding {
        std::mem::take(&mut self.binding)
    }

    async fn fetch(&self, kind: StatementKind, sql: &str, params: &Params) -> OrmResult<Vec<Row>> {
        let compiled = compile(sql, params)?;
        self.logger
            .statement(kind, &compiled.sql, compiled.param_count());
        let result = self.client.query(&compiled.sql, &compiled.params()).await;
        if let Err(err) = &result {
            self.logger.failure(kind, &compiled.sql, err);
        }
        result
    }

    async fn run(&self, kind: StatementKind, sql: &str, params: &Params) -> OrmResult<u64> {
        let compiled = compile(sql, params)?;
        self.logger
            .statement(kind, &compiled.sql, compiled.param_count());
        let result = self.client.execute(&compiled.sql, &compiled.params()).await;
        if let Err(err) = &result {
            self.logger.failure(kind, &compiled.sql, err);
        }
        result
    }

    async fn select_with(&self, binding: Binding) -> OrmResult<Vec<M>> {
        binding.validate()?;
        let sql = self.builder.select(&M::META, &binding);
        let rows = self
            .fetch(StatementKind::Select, &sql, &binding.params())
            .await?;
        rows.iter().map(M::from_row).collect()
    }

    async fn first_with(&self, mut binding: Binding) -> OrmResult<M> {
        binding.limit = 1;
        self.select_with(binding)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::not_found(format!("no matching row in {}", M::META.table)))
    }

    async fn aggregate_row(&self, mut binding: Binding, func: AggregateFn, column: &str) -> OrmResult<Row> {
        binding.aggregate = Some(Aggregate {
            func,
            column: column.to_string(),
        });
        // a single aggregate row: ordering and paging do not apply
        binding.order.clear();
        binding.limit = 0;
        binding.offset = 0;
        binding.validate()?;
        let sql = self.builder.select(&M::META, &binding);
        self.fetch(StatementKind::Aggregate, &sql, &binding.params())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::not_found(format!("{func} on {} returned no row", M::META.table)))
    }

    async fn count_with(&self, binding: Binding) -> OrmResult<i64> {
        let row = self.aggregate_row(binding, AggregateFn::Count, "*").await?;
        row.try_get::<_, i64>(0)
            .map_err(|e| OrmError::decode("count", e.to_string()))
    }

    async fn numeric_aggregate(&mut self, func: AggregateFn, column: &str) -> OrmResult<Option<f64>> {
        let binding = self.take_binding();
        let row = self.aggregate_row(binding, func, column).await?;
        decode_numeric(&row, column)
    }

    /// Every row matching the pending clauses.
    pub async fn get(&mut self) -> OrmResult<Vec<M>> {
        let binding = self.take_binding();
        self.select_with(binding).await
    }

    /// Every row of the table, ignoring pending clauses.
    pub async fn all(&mut self) -> OrmResult<Vec<M>> {
        self.binding.reset();
        self.select_with(Binding::new()).await
    }

    /// First matching row; [`OrmError::NotFound`] when there is none.
    pub async fn first(&mut self) -> OrmResult<M> {
        let binding = self.take_binding();
        self.first_with(binding).await
    }

    /// Row whose primary key equals `key`, combined with any pending clauses.
    pub async fn find(&mut self, key: impl Into<Value>) -> OrmResult<M> {
        let mut binding = self.take_binding();
        binding
            .conditions
            .push(Condition::and(M::META.primary_key, Op::eq(key)));
        self.first_with(binding).await
    }

    /// Page `page` (1-based) of the matching rows.
    ///
    /// `per_page == 0` falls back to [`DEFAULT_PER_PAGE`]. The total ignores grouping,
    /// ordering and paging clauses.
    pub async fn paginate(&mut self, page: u64, per_page: u64) -> OrmResult<Page<M>> {
        let mut binding = self.take_binding();
        if page == 0 {
            return Err(OrmError::validation("page numbers start at 1"));
        }
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| OrmError::validation(format!("page {page} is out of range")))?;

        let count = binding.for_count();
        binding.limit = per_page;
        binding.offset = offset;
        let data = self.select_with(binding).await?;
        let total = self.count_with(count).await?;

        Ok(Page {
            data,
            total,
            page,
            per_page,
        })
    }

    /// `COUNT("table".*)` of the matching rows.
    pub async fn count(&mut self) -> OrmResult<i64> {
        let binding = self.take_binding();
        self.count_with(binding.for_count()).await
    }

    /// `MAX(column)`; `None` when no row matches.
    pub async fn max(&mut self, column: &str) -> OrmResult<Option<f64>> {
        self.numeric_aggregate(AggregateFn::Max, column).await
    }

    pub async fn min(&mut self, column: &str) -> OrmResult<Option<f64>> {
        self.numeric_aggregate(AggregateFn::Min, column).await
    }

    pub async fn avg(&mut self, column: &str) -> OrmResult<Option<f64>> {
        self.numeric_aggregate(AggregateFn::Avg, column).await
    }

    pub async fn sum(&mut self, column: &str) -> OrmResult<Option<f64>> {
        self.numeric_aggregate(AggregateFn::Sum, column).await
    }

    /// Insert `model`, reading the generated primary key back into it.
    pub async fn insert(&mut self, model: &mut M) -> OrmResult<()> {
        self.insert_returning(model, &[M::META.primary_key]).await
    }

    /// Insert `model` and merge the `RETURNING` columns into it (`"*"` for all).
    pub async fn insert_returning(&mut self, model: &mut M, returning: &[&str]) -> OrmResult<()> {
        self.binding.reset();
        check_returning(returning)?;
        model.touch_created(Utc::now());

        let sql = self.builder.insert(&M::META, returning);
        let rows = self
            .fetch(StatementKind::Insert, &sql, &model.payload())
            .await?;
        if let Some(row) = rows.first() {
            model.merge_row(row)?;
        }
        Ok(())
    }

    /// Insert every model in one statement; returned keys are merged back by position.
    pub async fn bulk_insert(&mut self, models: &mut [M]) -> OrmResult<u64> {
        self.bulk_insert_returning(models, &[M::META.primary_key])
            .await
    }

    pub async fn bulk_insert_returning(
        &mut self,
        models: &mut [M],
        returning: &[&str],
    ) -> OrmResult<u64> {
        self.binding.reset();
        if models.is_empty() {
            return Err(OrmError::config("bulk insert needs at least one model"));
        }
        let width = M::META.insert_columns().len();
        if width == 0 {
            return Err(OrmError::config(format!(
                "{} has no insertable columns",
                M::META.table
            )));
        }
        if models.len().saturating_mul(width) > MAX_BIND_PARAMS {
            return Err(OrmError::validation(format!(
                "bulk insert of {} rows needs more than {MAX_BIND_PARAMS} parameters",
                models.len()
            )));
        }
        check_returning(returning)?;

        let now = Utc::now();
        let mut params = Params::new();
        for (i, model) in models.iter_mut().enumerate() {
            model.touch_created(now);
            params.extend_prefixed(i, model.payload());
        }

        let sql = self.builder.bulk_insert(&M::META, models.len(), returning);
        let rows = self.fetch(StatementKind::Insert, &sql, &params).await?;
        for (model, row) in models.iter_mut().zip(rows.iter()) {
            model.merge_row(row)?;
        }
        Ok(models.len() as u64)
    }

    /// Update the declared non-key columns of `model` and its `updated_at`, by primary key.
    pub async fn update(&mut self, model: &mut M) -> OrmResult<u64> {
        self.binding.reset();
        if M::META.update_columns().is_empty() {
            return Err(OrmError::config(format!(
                "{} has no columns to update",
                M::META.table
            )));
        }
        model.touch_updated(Utc::now());
        let sql = self.builder.update(&M::META);
        self.run(StatementKind::Update, &sql, &model.payload())
            .await
    }

    /// Delete `model` by primary key. Soft-delete models get `deleted_at` set instead.
    pub async fn delete(&mut self, model: &mut M) -> OrmResult<u64> {
        self.binding.reset();
        let sql = if M::META.soft_delete {
            model.mark_deleted(Utc::now());
            self.builder.soft_delete(&M::META)
        } else {
            self.builder.delete(&M::META)
        };
        self.run(StatementKind::Delete, &sql, &model.payload())
            .await
    }

    /// Delete every row matching the pending clauses; at least one clause is required.
    pub async fn delete_where(&mut self) -> OrmResult<u64> {
        let binding = self.take_binding();
        if binding.conditions.is_empty() {
            return Err(OrmError::validation(
                "delete_where needs at least one condition",
            ));
        }
        binding.validate()?;
        let mut params = binding.params();
        let sql = if M::META.soft_delete {
            params.insert(DELETED_AT, Utc::now());
            self.builder
                .soft_delete_where(&M::META, &binding.conditions)
        } else {
            self.builder.delete_where(&M::META, &binding.conditions)
        };
        self.run(StatementKind::Delete, &sql, &params).await
    }

    /// Execute a statement with `:name` placeholders; returns the affected row count.
    pub async fn raw_command(&mut self, sql: &str, params: &Params) -> OrmResult<u64> {
        self.binding.reset();
        self.run(StatementKind::Raw, sql, params).await
    }

    /// Run a query with `:name` placeholders and decode the rows as `M`.
    pub async fn raw_query(&mut self, sql: &str, params: &Params) -> OrmResult<Vec<M>> {
        self.raw_query_as::<M>(sql, params).await
    }

    /// Like [`raw_query`](Self::raw_query), decoding into any [`FromRow`] type.
    pub async fn raw_query_as<R: FromRow>(&mut self, sql: &str, params: &Params) -> OrmResult<Vec<R>> {
        self.binding.reset();
        let rows = self.fetch(StatementKind::Raw, sql, params).await?;
        rows.iter().map(R::from_row).collect()
    }
}

fn check_returning(columns: &[&str]) -> OrmResult<()> {
    for col in columns {
        if *col != "*" {
            check_ident(col, "returning column")?;
        }
    }
    Ok(())
}

/// First column of an aggregate row as `f64`, whatever numeric type the server chose.
fn decode_numeric(row: &Row, column: &str) -> OrmResult<Option<f64>> {
    let decode_err = |e: tokio_postgres::Error| OrmError::decode(column, e.to_string());
    let ty = row
        .columns()
        .first()
        .map(|c| c.type_().clone())
        .ok_or_else(|| OrmError::decode(column, "aggregate row has no columns"))?;

    let value = if ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(0).map_err(decode_err)?.map(f64::from)
    } else if ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(0).map_err(decode_err)?.map(f64::from)
    } else if ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(0)
            .map_err(decode_err)?
            .map(|v| v as f64)
    } else if ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(0).map_err(decode_err)?.map(f64::from)
    } else if ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(0).map_err(decode_err)?
    } else if ty == Type::NUMERIC {
        match row.try_get::<_, Option<Decimal>>(0).map_err(decode_err)? {
            Some(d) => Some(
                d.to_f64()
                    .ok_or_else(|| OrmError::decode(column, format!("{d} does not fit in f64")))?,
            ),
            None => None,
        }
    } else {
        return Err(OrmError::decode(
            column,
            format!("aggregate of type {ty} is not numeric"),
        ));
    };
    Ok(value)
}
