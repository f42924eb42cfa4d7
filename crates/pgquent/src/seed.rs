//! Seeders: fixed rows bulk-inserted inside a transaction.

use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::log::TARGET;
use crate::model::Model;
use crate::query::Query;

/// Produces the rows to seed for model `M`.
///
/// ```ignore
/// struct GenreSeeder;
///
/// impl Seeder<Genre> for GenreSeeder {
///     fn seed(&self) -> Vec<Genre> {
///         ["drama", "horror"].into_iter().map(Genre::named).collect()
///     }
/// }
///
/// pgquent::seed::seed(&client, &GenreSeeder).await?;
/// ```
pub trait Seeder<M: Model> {
    fn seed(&self) -> Vec<M>;
}

/// Insert every row of `seeder` in one transaction; returns the inserted count.
///
/// On failure the transaction is rolled back and the insert error returned.
pub async fn seed<M, C, S>(client: &C, seeder: &S) -> OrmResult<u64>
where
    M: Model,
    C: GenericClient,
    S: Seeder<M> + ?Sized,
{
    let mut rows = seeder.seed();
    if rows.is_empty() {
        return Ok(0);
    }

    let mut query = Query::<M, C>::new(client);
    query.begin_transaction().await?;
    match query.bulk_insert(&mut rows).await {
        Ok(n) => {
            query.commit().await?;
            query.end_transaction()?;
            tracing::info!(target: TARGET, table = M::META.table, rows = n, "seeded");
            Ok(n)
        }
        Err(err) => {
            query.rollback().await?;
            query.end_transaction()?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;
    use crate::model::ModelMeta;
    use crate::row::FromRow;
    use crate::sql::Params;
    use std::sync::Mutex;
    use tokio_postgres::Row;
    use tokio_postgres::types::ToSql;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_inserts: bool,
    }

    impl GenericClient for Recorder {
        async fn query(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.fail_inserts {
                return Err(OrmError::Other("duplicate key".into()));
            }
            Ok(vec![])
        }

        async fn execute(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
            self.log.lock().unwrap().push(sql.to_string());
            Ok(0)
        }

        async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
            self.log.lock().unwrap().push(sql.to_string());
            Ok(())
        }
    }

    struct Tag(String);

    impl FromRow for Tag {
        fn from_row(row: &Row) -> OrmResult<Self> {
            Ok(Tag(row.try_get("label")?))
        }
    }

    impl Model for Tag {
        const META: ModelMeta = ModelMeta::new("tags", "label", &["label"]);

        fn payload(&self) -> Params {
            crate::params! { "label" => self.0.clone() }
        }

        fn merge_row(&mut self, _: &Row) -> OrmResult<()> {
            Ok(())
        }
    }

    struct Tags(&'static [&'static str]);

    impl Seeder<Tag> for Tags {
        fn seed(&self) -> Vec<Tag> {
            self.0.iter().map(|s| Tag(s.to_string())).collect()
        }
    }

    #[tokio::test]
    async fn seeds_inside_a_transaction() {
        let client = Recorder::default();
        let n = seed(&client, &Tags(&["red", "blue"])).await.unwrap();

        assert_eq!(n, 2);
        let log = client.log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], "BEGIN");
        assert_eq!(
            log[1],
            "INSERT INTO tags (\"label\") VALUES ($1), ($2) RETURNING \"label\""
        );
        assert_eq!(log[2], "COMMIT");
    }

    #[tokio::test]
    async fn failed_insert_rolls_back() {
        let client = Recorder {
            fail_inserts: true,
            ..Recorder::default()
        };
        let err = seed(&client, &Tags(&["red"])).await.unwrap_err();

        assert!(matches!(err, OrmError::Other(_)));
        assert_eq!(client.log.lock().unwrap().last().unwrap(), "ROLLBACK");
    }

    #[tokio::test]
    async fn empty_seeder_touches_nothing() {
        let client = Recorder::default();
        assert_eq!(seed(&client, &Tags(&[])).await.unwrap(), 0);
        assert!(client.log.lock().unwrap().is_empty());
    }
}
