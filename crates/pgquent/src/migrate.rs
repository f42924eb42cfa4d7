//! Schema migrations.
//!
//! A [`Migration`] is one batch of [`Schema`] operations applied in a single transaction.
//! Applied tables are recorded in the `migrations` ledger table together with their
//! batch number, and batches already in the ledger are skipped on later runs.
//!
//! ```ignore
//! use pgquent::migrate::{Migration, MigrateOptions, migrate};
//! use pgquent::Schema;
//!
//! let genres = Schema::create("genres", |t| {
//!     t.integer("id").auto_increment();
//!     t.string("name").unique();
//!     t.timestamp();
//! })?;
//!
//! let report = migrate(&mut client, &[Migration::new([genres])], MigrateOptions::default()).await?;
//! println!("{} tables migrated", report.applied.len());
//! ```

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::log::{SqlLogger, StatementKind, TARGET};
use crate::schema::{Command, Schema};
use std::collections::HashSet;
use tokio_postgres::Client;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "migrations";

const RESET_SCHEMA_SQL: &str = "DROP SCHEMA public CASCADE; CREATE SCHEMA public; \
GRANT ALL ON ALL TABLES IN SCHEMA public TO public;";

/// One batch of schema operations.
#[derive(Debug, Clone, Default)]
pub struct Migration {
    schemas: Vec<Schema>,
}

impl Migration {
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            schemas: schemas.into_iter().collect(),
        }
    }

    /// Append a schema operation to the batch.
    pub fn with(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Drop and recreate the `public` schema before migrating. Destroys all data.
    pub forced: bool,
}

impl MigrateOptions {
    pub fn forced() -> Self {
        Self { forced: true }
    }
}

/// A table operation that was executed and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub batch: i32,
    pub command: Command,
    pub table: String,
}

/// Outcome of a [`migrate`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    /// CREATE operations skipped because the table already existed.
    pub existing_tables: Vec<String>,
    /// Batches found in the ledger and not run again.
    pub skipped_batches: Vec<i32>,
    pub forced: bool,
}

/// Apply `migrations` in order, numbering batches from 1.
///
/// Any failing statement rolls its batch back and aborts the run; earlier batches stay
/// committed.
pub async fn migrate(
    client: &mut Client,
    migrations: &[Migration],
    options: MigrateOptions,
) -> OrmResult<MigrationReport> {
    let mut report = MigrationReport {
        forced: options.forced,
        ..MigrationReport::default()
    };

    if options.forced {
        reset_schema(client).await?;
    }

    if !table_exists(&*client, LEDGER_TABLE).await? {
        run_batch(client, &[ledger_schema()?], 0, &mut report).await?;
    }

    let done = applied_batches(&*client).await?;
    let (pending, skipped) = plan_batches(migrations.len(), &done)?;
    for &batch in &skipped {
        tracing::info!(target: TARGET, batch, "batch already applied, skipping");
    }
    report.skipped_batches = skipped;

    for (batch, migration) in (1..).zip(migrations) {
        if pending.contains(&batch) {
            run_batch(client, migration.schemas(), batch, &mut report).await?;
        }
    }

    Ok(report)
}

/// Schema of the ledger table.
pub fn ledger_schema() -> OrmResult<Schema> {
    Schema::create(LEDGER_TABLE, |t| {
        t.text("command").not_null();
        t.text("migrate").not_null();
        t.integer("batch").not_null();
    })
}

/// Split batch numbers `1..=count` into those still to run and those already in the ledger.
fn plan_batches(count: usize, done: &HashSet<i32>) -> OrmResult<(Vec<i32>, Vec<i32>)> {
    let last = i32::try_from(count).map_err(|_| OrmError::config("too many migration batches"))?;
    Ok((1..=last).partition(|batch| !done.contains(batch)))
}

async fn reset_schema(client: &mut Client) -> OrmResult<()> {
    tracing::warn!(target: TARGET, "forced migration: dropping and recreating schema public");
    let tx = client
        .transaction()
        .await
        .map_err(|e| OrmError::Migration(format!("cannot begin schema reset: {e}")))?;
    GenericClient::batch_execute(&tx, RESET_SCHEMA_SQL)
        .await
        .map_err(|e| OrmError::Migration(format!("schema reset failed: {e}")))?;
    tx.commit()
        .await
        .map_err(|e| OrmError::Migration(format!("schema reset failed: {e}")))
}

async fn run_batch(
    client: &mut Client,
    schemas: &[Schema],
    batch: i32,
    report: &mut MigrationReport,
) -> OrmResult<()> {
    let tx = client
        .transaction()
        .await
        .map_err(|e| OrmError::Migration(format!("batch {batch}: cannot begin: {e}")))?;

    let applied = match existing_tables(&tx, schemas).await {
        Ok(existing) => apply_batch(&tx, schemas, batch, existing).await,
        Err(err) => Err(OrmError::Migration(format!("batch {batch}: {err}"))),
    };
    let outcome = match applied {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Err(rb) = tx.rollback().await {
                tracing::warn!(target: TARGET, batch, error = %rb, "rollback failed");
            }
            return Err(err);
        }
    };

    tx.commit()
        .await
        .map_err(|e| OrmError::Migration(format!("batch {batch}: commit failed: {e}")))?;
    report.applied.extend(outcome.applied);
    report.existing_tables.extend(outcome.skipped);
    Ok(())
}

/// What one batch did.
#[derive(Debug, Default, PartialEq, Eq)]
struct BatchOutcome {
    applied: Vec<AppliedMigration>,
    /// CREATEs skipped because the table already existed.
    skipped: Vec<String>,
}

/// Run the statements of one batch and write a ledger row for each one executed.
///
/// `existing` holds the tables present when the batch started and is kept current as
/// tables are created and dropped.
async fn apply_batch<C: GenericClient>(
    client: &C,
    schemas: &[Schema],
    batch: i32,
    mut existing: HashSet<String>,
) -> OrmResult<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for schema in schemas {
        let table = schema.table_name();
        let command = schema.command();
        if command == Command::Create && existing.contains(table) {
            tracing::info!(target: TARGET, table, batch, "table exists, skipping create");
            outcome.skipped.push(table.to_string());
            continue;
        }

        apply_schema(client, schema, batch)
            .await
            .map_err(|err| OrmError::Migration(format!("batch {batch}, table {table}: {err}")))?;

        match command {
            Command::Create => {
                existing.insert(table.to_string());
            }
            Command::Drop => {
                existing.remove(table);
            }
            Command::Alter => {}
        }
        outcome.applied.push(AppliedMigration {
            batch,
            command,
            table: table.to_string(),
        });
    }
    Ok(outcome)
}

async fn apply_schema<C: GenericClient>(client: &C, schema: &Schema, batch: i32) -> OrmResult<()> {
    let table = schema.table_name();
    let sql = schema.to_sql();
    SqlLogger::default().statement(StatementKind::Ddl, &sql, 0);
    client.batch_execute(&sql).await?;

    let command = schema.command().as_str();
    client
        .execute(
            &format!("INSERT INTO {LEDGER_TABLE} (command, migrate, batch) VALUES ($1, $2, $3)"),
            &[&command, &table, &batch],
        )
        .await?;

    tracing::info!(target: TARGET, table, command, batch, "migrated");
    Ok(())
}

/// Tables targeted by a CREATE in `schemas` that already exist.
async fn existing_tables<C: GenericClient>(
    client: &C,
    schemas: &[Schema],
) -> OrmResult<HashSet<String>> {
    let mut existing = HashSet::new();
    for schema in schemas {
        let table = schema.table_name();
        if schema.command() == Command::Create
            && !existing.contains(table)
            && table_exists(client, table).await?
        {
            existing.insert(table.to_string());
        }
    }
    Ok(existing)
}

async fn table_exists<C: GenericClient>(client: &C, table: &str) -> OrmResult<bool> {
    let row = client
        .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table])
        .await?;
    row.try_get::<_, bool>(0)
        .map_err(|e| OrmError::decode("to_regclass", e.to_string()))
}

async fn applied_batches<C: GenericClient>(client: &C) -> OrmResult<HashSet<i32>> {
    let rows = client
        .query(&format!("SELECT DISTINCT batch FROM {LEDGER_TABLE}"), &[])
        .await?;
    rows.iter()
        .map(|row| {
            row.try_get::<_, i32>(0)
                .map_err(|e| OrmError::decode("batch", e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_postgres::Row;
    use tokio_postgres::types::ToSql;

    /// Records statements with their parameters; DDL mentioning `fail_on` errors.
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn failing_on(table: &'static str) -> Self {
            Self {
                fail_on: Some(table),
                ..Self::default()
            }
        }

        fn statements(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl GenericClient for Recorder {
        async fn query(&self, sql: &str, _: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
            self.log.lock().unwrap().push(sql.to_string());
            Ok(vec![])
        }

        async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
            self.log.lock().unwrap().push(format!("{sql} {params:?}"));
            Ok(1)
        }

        async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
            if self.fail_on.is_some_and(|t| sql.contains(t)) {
                return Err(OrmError::Other("relation does not exist".into()));
            }
            self.log.lock().unwrap().push(sql.to_string());
            Ok(())
        }
    }

    fn create(table: &str) -> Schema {
        Schema::create(table, |t| {
            t.serial("id");
        })
        .unwrap()
    }

    const LEDGER_INSERT: &str = "INSERT INTO migrations (command, migrate, batch) VALUES ($1, $2, $3)";

    #[test]
    fn batches_in_the_ledger_are_skipped() {
        let done: HashSet<i32> = [0, 1, 3].into();
        let (pending, skipped) = plan_batches(4, &done).unwrap();
        assert_eq!(pending, [2, 4]);
        assert_eq!(skipped, [1, 3]);

        let (pending, skipped) = plan_batches(2, &[0].into()).unwrap();
        assert_eq!(pending, [1, 2]);
        assert!(skipped.is_empty());
    }

    #[tokio::test]
    async fn ledger_creation_is_recorded_as_batch_zero() {
        let client = Recorder::default();
        let outcome = apply_batch(&client, &[ledger_schema().unwrap()], 0, HashSet::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.applied,
            [AppliedMigration {
                batch: 0,
                command: Command::Create,
                table: LEDGER_TABLE.to_string(),
            }]
        );
        assert_eq!(
            client.statements(),
            [
                ledger_schema().unwrap().to_sql(),
                format!(r#"{LEDGER_INSERT} ["CREATE", "migrations", 0]"#),
            ]
        );
    }

    #[tokio::test]
    async fn existing_tables_skip_create_and_get_no_ledger_row() {
        let client = Recorder::default();
        let alter = Schema::table("genres", |t| {
            t.text("blurb");
        })
        .unwrap();
        let schemas = [create("genres"), create("authors"), alter];
        let outcome = apply_batch(&client, &schemas, 2, ["genres".to_string()].into())
            .await
            .unwrap();

        assert_eq!(outcome.skipped, ["genres"]);
        let applied: Vec<_> = outcome
            .applied
            .iter()
            .map(|m| (m.command, m.table.as_str()))
            .collect();
        assert_eq!(applied, [(Command::Create, "authors"), (Command::Alter, "genres")]);

        let statements = client.statements();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], create("authors").to_sql());
        assert_eq!(statements[1], format!(r#"{LEDGER_INSERT} ["CREATE", "authors", 2]"#));
        assert!(statements[2].starts_with("ALTER TABLE genres"));
        assert_eq!(statements[3], format!(r#"{LEDGER_INSERT} ["ALTER", "genres", 2]"#));
    }

    #[tokio::test]
    async fn tables_created_earlier_in_the_batch_count_as_existing() {
        let client = Recorder::default();
        let schemas = [
            create("tags"),
            create("tags"),
            Schema::drop_table("tags").unwrap(),
            create("tags"),
        ];
        let outcome = apply_batch(&client, &schemas, 1, HashSet::new()).await.unwrap();

        assert_eq!(outcome.skipped, ["tags"]);
        let commands: Vec<_> = outcome.applied.iter().map(|m| m.command).collect();
        assert_eq!(commands, [Command::Create, Command::Drop, Command::Create]);
    }

    #[tokio::test]
    async fn failing_statement_names_batch_and_table() {
        let client = Recorder::failing_on("books");
        let schemas = [create("genres"), create("books"), create("authors")];
        let err = apply_batch(&client, &schemas, 3, HashSet::new())
            .await
            .unwrap_err();

        match err {
            OrmError::Migration(msg) => assert!(msg.starts_with("batch 3, table books"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        // nothing after the failing statement ran
        let statements = client.statements();
        assert_eq!(statements.len(), 2);
        assert!(!statements.iter().any(|s| s.contains("authors")));
    }

    #[test]
    fn ledger_table_ddl() {
        assert_eq!(
            ledger_schema().unwrap().to_sql(),
            "CREATE TABLE IF NOT EXISTS migrations ( command TEXT NOT NULL,migrate TEXT NOT NULL,batch INTEGER NOT NULL );\n"
        );
    }

    #[test]
    fn migration_collects_schemas_in_order() {
        let m = Migration::new([Schema::drop_table("a").unwrap()])
            .with(Schema::drop_table("b").unwrap());
        let tables: Vec<_> = m.schemas().iter().map(|s| s.table_name()).collect();
        assert_eq!(tables, ["a", "b"]);
        assert!(!MigrateOptions::default().forced);
        assert!(MigrateOptions::forced().forced);
    }
}
