//! Database round trips. Skipped unless `DATABASE_URL` is set.
//!
//! Every test works in its own schema, selected through `search_path`.

use pgquent::migrate::{MigrateOptions, Migration, migrate};
use pgquent::{
    Compare, DbConfig, Direction, FromRow, Model, OrmError, Query, Schema, Timestamps, params,
};

async fn try_connect(schema: &str) -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok()?;
    let client = DbConfig::from_env()
        .expect("valid database config")
        .connect()
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    client
        .batch_execute(&format!(
            "DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema}; SET search_path TO {schema};"
        ))
        .await
        .expect("fresh test schema");
    Some(client)
}

#[derive(Debug, Clone, Default, Model, FromRow)]
#[orm(table = "genres", auto_increment, timestamps)]
struct Genre {
    #[orm(id)]
    id: i32,
    name: String,
    #[orm(meta)]
    meta: Timestamps,
}

#[derive(Debug, Clone, Default, Model, FromRow)]
#[orm(table = "books", auto_increment, soft_delete)]
struct Book {
    id: i64,
    title: String,
    pages: i32,
    #[orm(meta)]
    meta: Timestamps,
}

fn genre(name: &str) -> Genre {
    Genre {
        name: name.to_string(),
        ..Genre::default()
    }
}

async fn create_tables(client: &tokio_postgres::Client) {
    let genres = Schema::create("genres", |t| {
        t.integer("id").auto_increment();
        t.string("name").unique();
        t.timestamp();
    })
    .unwrap();
    let books = Schema::create("books", |t| {
        t.big_integer("id").auto_increment();
        t.text("title").not_null();
        t.integer("pages").not_null();
        t.soft_delete();
    })
    .unwrap();
    for schema in [genres, books] {
        client.batch_execute(&schema.to_sql()).await.unwrap();
    }
}

#[tokio::test]
async fn insert_select_update_delete() {
    let Some(client) = try_connect("pgquent_crud").await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_tables(&client).await;

    let mut q = Query::<Genre>::new(&client);
    let mut drama = genre("drama");
    q.insert(&mut drama).await.unwrap();
    assert!(drama.id > 0);
    assert!(drama.meta.created_at.is_some());

    let mut rest = vec![genre("horror"), genre("comedy"), genre("documentary")];
    assert_eq!(q.bulk_insert(&mut rest).await.unwrap(), 3);
    assert!(rest.iter().all(|g| g.id > drama.id));

    let found = q.find(drama.id).await.unwrap();
    assert_eq!(found.name, "drama");

    let names: Vec<String> = q
        .and_where("name", Compare::Ilike, "%o%")
        .or_where("id", Compare::Eq, drama.id)
        .order_by(Direction::Asc, ["name"])
        .get()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, ["comedy", "documentary", "drama", "horror"]);

    drama.name = "melodrama".into();
    assert_eq!(q.update(&mut drama).await.unwrap(), 1);
    assert_eq!(q.find(drama.id).await.unwrap().name, "melodrama");

    // a hand-built instance carries no created_at; the stored one must survive
    let mut detached = Genre {
        id: drama.id,
        name: "tragedy".into(),
        ..Genre::default()
    };
    assert_eq!(q.update(&mut detached).await.unwrap(), 1);
    let stored = q.find(drama.id).await.unwrap();
    assert_eq!(stored.name, "tragedy");
    assert_eq!(stored.meta.created_at, drama.meta.created_at);
    assert!(stored.meta.updated_at.is_some());

    assert_eq!(q.delete(&mut drama).await.unwrap(), 1);
    assert!(q.find(drama.id).await.unwrap_err().is_not_found());
    assert_eq!(q.count().await.unwrap(), 3);
}

#[tokio::test]
async fn unique_violation_is_mapped() {
    let Some(client) = try_connect("pgquent_unique").await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_tables(&client).await;

    let mut q = Query::<Genre>::new(&client);
    q.insert(&mut genre("drama")).await.unwrap();
    let err = q.insert(&mut genre("drama")).await.unwrap_err();
    assert!(err.is_unique_violation(), "{err:?}");
}

#[tokio::test]
async fn paginate_and_aggregates() {
    let Some(client) = try_connect("pgquent_pages").await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_tables(&client).await;

    let mut q = Query::<Book>::new(&client);
    let mut books: Vec<Book> = (1..=7)
        .map(|i| Book {
            title: format!("vol {i}"),
            pages: i * 100,
            ..Book::default()
        })
        .collect();
    q.bulk_insert(&mut books).await.unwrap();

    let page = q
        .order_by(Direction::Asc, ["id"])
        .paginate(2, 3)
        .await
        .unwrap();
    assert_eq!(page.total, 7);
    assert_eq!(page.last_page(), 3);
    let titles: Vec<_> = page.data.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["vol 4", "vol 5", "vol 6"]);

    assert_eq!(q.max("pages").await.unwrap(), Some(700.0));
    assert_eq!(q.min("pages").await.unwrap(), Some(100.0));
    assert_eq!(q.sum("pages").await.unwrap(), Some(2800.0));
    assert_eq!(q.avg("pages").await.unwrap(), Some(400.0));
    assert_eq!(
        q.where_between("pages", 1000, 2000).max("pages").await.unwrap(),
        None
    );

    // soft delete keeps the row and stamps it
    let mut first = books.remove(0);
    q.delete(&mut first).await.unwrap();
    let reread = q.find(first.id).await.unwrap();
    assert!(reread.meta.is_deleted());
    assert_eq!(q.where_not_null("deleted_at").count().await.unwrap(), 1);

    // updating a soft-deleted row does not restore it
    let mut edited = Book {
        id: first.id,
        title: "vol 1, revised".into(),
        pages: 110,
        ..Book::default()
    };
    q.update(&mut edited).await.unwrap();
    assert!(q.find(first.id).await.unwrap().meta.is_deleted());
}

#[tokio::test]
async fn rollback_discards_writes() {
    let Some(client) = try_connect("pgquent_tx").await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_tables(&client).await;

    let mut q = Query::<Genre>::new(&client);
    q.begin_transaction().await.unwrap();
    q.insert(&mut genre("noir")).await.unwrap();
    assert_eq!(q.count().await.unwrap(), 1);
    q.rollback().await.unwrap();
    q.end_transaction().unwrap();
    assert_eq!(q.count().await.unwrap(), 0);

    q.begin_transaction().await.unwrap();
    q.insert(&mut genre("noir")).await.unwrap();
    q.commit().await.unwrap();
    q.end_transaction().unwrap();
    assert_eq!(q.count().await.unwrap(), 1);
}

#[tokio::test]
async fn raw_statements_use_named_placeholders() {
    let Some(client) = try_connect("pgquent_raw").await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    create_tables(&client).await;

    let mut q = Query::<Genre>::new(&client);
    let inserted = q
        .raw_command(
            "INSERT INTO genres (name) VALUES (:a), (:b)",
            &params! { "a" => "drama", "b" => "horror" },
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let rows = q
        .raw_query(
            "SELECT * FROM genres WHERE name = :name OR name || '' = :name",
            &params! { "name" => "horror" },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let err = q
        .raw_query("SELECT * FROM genres WHERE id = :missing", &params! {})
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[tokio::test]
async fn migrations_apply_once() {
    let Some(mut client) = try_connect("pgquent_migrate").await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let batches = [
        Migration::new([Schema::create("authors", |t| {
            t.uuid("id").primary_key();
            t.string("name").not_null();
            t.timestamp();
        })
        .unwrap()]),
        Migration::new([Schema::table("authors", |t| {
            t.date("born_at");
            t.rename("name", "full_name");
        })
        .unwrap()]),
    ];

    let report = migrate(&mut client, &batches, MigrateOptions::default())
        .await
        .unwrap();
    assert_eq!(report.applied.len(), 3);
    assert_eq!(report.applied[0].table, "migrations");
    assert_eq!(report.applied[0].batch, 0);
    assert_eq!(report.applied[2].batch, 2);

    let again = migrate(&mut client, &batches, MigrateOptions::default())
        .await
        .unwrap();
    assert!(again.applied.is_empty());
    assert_eq!(again.skipped_batches, [1, 2]);

    let row = client
        .query_one(
            "SELECT count(*) FROM information_schema.columns \
             WHERE table_schema = 'pgquent_migrate' AND table_name = 'authors' \
             AND column_name IN ('full_name', 'born_at')",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(row.get::<_, i64>(0), 2);
}
