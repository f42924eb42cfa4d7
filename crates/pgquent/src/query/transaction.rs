//! Transaction control on a [`Query`].
//!
//! `BEGIN`/`COMMIT`/`ROLLBACK` are sent on the query's connection, so every statement the
//! query runs in between belongs to the transaction. Nothing is rolled back
//! automatically: on error, call [`Query::rollback`] yourself.

use super::{Query, TxState};
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::log::{StatementKind, TARGET};
use crate::model::Model;

impl<'c, M: Model, C: GenericClient> Query<'c, M, C> {
    async fn control(&self, sql: &str) -> OrmResult<()> {
        self.logger.statement(StatementKind::Transaction, sql, 0);
        let result = self.client.batch_execute(sql).await;
        if let Err(err) = &result {
            self.logger.failure(StatementKind::Transaction, sql, err);
        }
        result
    }

    /// Whether `begin_transaction` succeeded and neither commit nor rollback ran yet.
    pub fn in_transaction(&self) -> bool {
        self.tx == TxState::Active
    }

    /// Send `BEGIN`. Fails if a transaction is already open on this query.
    pub async fn begin_transaction(&mut self) -> OrmResult<&mut Self> {
        if self.tx == TxState::Active {
            return Err(OrmError::transaction(
                "a transaction is already open on this query",
            ));
        }
        self.control("BEGIN").await?;
        self.tx = TxState::Active;
        Ok(self)
    }

    /// Send `COMMIT`.
    pub async fn commit(&mut self) -> OrmResult<()> {
        self.finish("COMMIT").await
    }

    /// Send `ROLLBACK`.
    pub async fn rollback(&mut self) -> OrmResult<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, sql: &str) -> OrmResult<()> {
        if self.tx != TxState::Active {
            return Err(OrmError::transaction(format!(
                "{sql} without an open transaction"
            )));
        }
        // the server leaves the transaction block even when COMMIT fails
        self.tx = TxState::Finished;
        self.control(sql).await
    }

    /// Clear the transaction handle after commit or rollback.
    pub fn end_transaction(&mut self) -> OrmResult<()> {
        if self.tx == TxState::Active {
            return Err(OrmError::transaction(
                "commit or roll back before ending the transaction",
            ));
        }
        self.tx = TxState::Idle;
        Ok(())
    }
}

impl<M, C: GenericClient> Drop for Query<'_, M, C> {
    fn drop(&mut self) {
        if self.tx == TxState::Active {
            tracing::warn!(
                target: TARGET,
                "query dropped inside an open transaction; the connection stays in it until ROLLBACK"
            );
        }
    }
}
