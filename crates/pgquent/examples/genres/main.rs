//! Query façade walkthrough on a `genres` table.
//!
//! Run with:
//!   cargo run --example genres -p pgquent
//!
//! Connection settings come from `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASS`/`DB_NAME`
//! or `DATABASE_URL` (a `.env` file works too).

use pgquent::prelude::*;
use pgquent::seed::seed;
use pgquent::{Direction, Seeder};

#[derive(Debug, Clone, Default, Model, FromRow)]
#[orm(table = "genres", auto_increment, timestamps, soft_delete)]
struct Genre {
    #[orm(id)]
    id: i32,
    name: String,
    #[orm(meta)]
    meta: Timestamps,
}

impl Genre {
    fn named(name: impl Into<String>) -> Self {
        Genre {
            name: name.into(),
            ..Genre::default()
        }
    }
}

struct GenreSeeder;

impl Seeder<Genre> for GenreSeeder {
    fn seed(&self) -> Vec<Genre> {
        ["Action", "Comedy", "Drama", "Horror"]
            .into_iter()
            .map(Genre::named)
            .collect()
    }
}

#[tokio::main]
async fn main() -> OrmResult<()> {
    let mut client = DbConfig::from_env()?.connect().await?;

    let genres = Schema::create("genres", |t| {
        t.integer("id").auto_increment();
        t.string("name").unique();
        t.timestamp();
        t.soft_delete();
    })?;
    let report = migrate(&mut client, &[Migration::new([genres])], MigrateOptions::default()).await?;
    println!("migrated: {:?}", report.applied);

    match seed(&client, &GenreSeeder).await {
        Ok(n) => println!("seeded {n} genres"),
        Err(e) if e.is_unique_violation() => println!("genres already seeded"),
        Err(e) => return Err(e),
    }

    let mut q = Query::<Genre>::new(&client);

    // single insert inside a transaction
    q.begin_transaction().await?;
    let mut thriller = Genre::named(format!("Thriller {}", chrono::Utc::now().timestamp()));
    match q.insert(&mut thriller).await {
        Ok(()) => q.commit().await?,
        Err(e) => {
            q.rollback().await?;
            println!("insert failed: {e}");
        }
    }
    q.end_transaction()?;
    println!("inserted {thriller:?}");

    let matches = q
        .and_where("name", Compare::Ilike, "%o%")
        .or_where("id", Compare::Eq, thriller.id)
        .order_by(Direction::Desc, ["id"])
        .take(10)
        .get()
        .await?;
    for g in &matches {
        println!("  #{} {}", g.id, g.name);
    }

    let page = q.paginate(1, 2).await?;
    println!(
        "page {}/{} of {} genres: {:?}",
        page.page,
        page.last_page(),
        page.total,
        page.data.iter().map(|g| &g.name).collect::<Vec<_>>()
    );

    let raw = q
        .raw_query(
            "SELECT * FROM genres WHERE name = :name",
            &params! { "name" => "Drama" },
        )
        .await?;
    println!("raw: {raw:?}");

    q.delete(&mut thriller).await?;
    println!("soft-deleted at {:?}", thriller.meta.deleted_at);
    println!("{} genres total", q.count().await?);

    Ok(())
}
