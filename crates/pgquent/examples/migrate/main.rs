//! Apply a three-batch migration plan and print the DDL of every step.
//!
//! Run with:
//!   cargo run --example migrate -p pgquent
//!
//! Pass `--fresh` to drop and recreate the `public` schema first (destroys all data).

use pgquent::migrate::{MigrateOptions, Migration, migrate};
use pgquent::{OrmResult, ReferenceAction, Schema};

fn plan() -> OrmResult<Vec<Migration>> {
    let genres = Schema::create("genres", |t| {
        t.integer("id").auto_increment();
        t.string("name").unique();
        t.index(["id", "name"]);
        t.timestamp();
        t.soft_delete();
    })?;

    let authors = Schema::create("authors", |t| {
        t.uuid("id").primary_key();
        t.string("name").not_null();
        t.date("born_at");
        t.timestamp();
    })?;

    let books = Schema::create("books", |t| {
        t.integer("id").auto_increment();
        t.string("name").not_null();
        t.uuid("author_id");
        t.integer("genre_id");
        t.timestamp();
        t.soft_delete();
        t.index(["name", "author_id"]);
        t.foreign("author_id")
            .on("authors")
            .references("id")
            .on_update(ReferenceAction::Cascade)
            .on_delete(ReferenceAction::Restrict);
        t.foreign("genre_id").on("genres").references("id");
    })?;

    let authors_v2 = Schema::table("authors", |t| {
        t.string("email").unique();
        t.text("name").change();
        t.rename("born_at", "birthday");
    })?;

    Ok(vec![
        Migration::new([genres, authors]),
        Migration::new([books]),
        Migration::new([authors_v2]),
    ])
}

#[tokio::main]
async fn main() -> OrmResult<()> {
    let fresh = std::env::args().any(|a| a == "--fresh");
    let plan = plan()?;

    for (i, migration) in plan.iter().enumerate() {
        println!("-- batch {}", i + 1);
        for schema in migration.schemas() {
            print!("{}", schema.to_sql());
        }
    }

    let mut client = pgquent::DbConfig::from_env()?.connect().await?;
    let options = if fresh {
        MigrateOptions::forced()
    } else {
        MigrateOptions::default()
    };
    let report = migrate(&mut client, &plan, options).await?;

    for applied in &report.applied {
        println!("applied {} {} (batch {})", applied.command, applied.table, applied.batch);
    }
    for table in &report.existing_tables {
        println!("exists  {table}");
    }
    if !report.skipped_batches.is_empty() {
        println!("skipped batches {:?}", report.skipped_batches);
    }
    Ok(())
}
