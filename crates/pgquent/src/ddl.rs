//! DDL rendering for [`Schema`] blueprints.
//!
//! Output shape is fixed; migration logs and tests compare it byte for byte.

use crate::schema::{Column, Command, Reference, Schema};

/// Render the statement(s) for a blueprint according to its command.
pub fn render(schema: &Schema) -> String {
    match schema.command() {
        Command::Create => create_table(schema),
        Command::Alter => alter_table(schema),
        Command::Drop => drop_table(schema),
    }
}

/// `CREATE TABLE IF NOT EXISTS ...;` plus the optional `<table>_indexes` index.
pub fn create_table(schema: &Schema) -> String {
    let table = schema.table_name();
    let columns: Vec<String> = schema.columns().iter().map(column_def).collect();
    let mut body = columns.join(",");
    if !schema.primary_keys().is_empty() {
        body.push_str(&format!(", PRIMARY KEY({})", schema.primary_keys().join(",")));
    }
    if !schema.unique_keys().is_empty() {
        body.push_str(&format!(", UNIQUE({})", schema.unique_keys().join(",")));
    }
    if !schema.references().is_empty() {
        let fks: Vec<String> = schema.references().iter().map(foreign_key_def).collect();
        body.push_str(", ");
        body.push_str(&fks.join(","));
    }

    let mut sql = format!("CREATE TABLE IF NOT EXISTS {table} ( {body} );\n");
    if !schema.indexes().is_empty() {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_indexes ON {table} ({});\n",
            schema.indexes().join(",")
        ));
    }
    sql
}

/// `ALTER TABLE` statements in fixed order: add, change type, rename, drop.
///
/// Each rename gets its own statement since PostgreSQL allows one `RENAME` per
/// `ALTER TABLE`.
pub fn alter_table(schema: &Schema) -> String {
    let table = schema.table_name();
    let mut statements = Vec::new();

    let adds: Vec<String> = schema
        .columns()
        .iter()
        .filter(|c| !c.is_modified())
        .map(|c| format!("ADD COLUMN IF NOT EXISTS {}", column_def(c)))
        .collect();
    if !adds.is_empty() {
        statements.push(format!("ALTER TABLE {table} {};", adds.join(",")));
    }

    let changes: Vec<String> = schema
        .columns()
        .iter()
        .filter(|c| c.is_modified())
        .map(|c| {
            let name = c.name();
            let ty = c.data_type().as_sql();
            format!("ALTER COLUMN {name} DROP DEFAULT,ALTER COLUMN {name} TYPE {ty} USING {name}::{ty}")
        })
        .collect();
    if !changes.is_empty() {
        statements.push(format!("ALTER TABLE {table} {};", changes.join(",")));
    }

    for col in schema.renames() {
        if let Some(prev) = col.previous_name() {
            statements.push(format!(
                "ALTER TABLE {table} RENAME COLUMN {prev} TO {};",
                col.name()
            ));
        }
    }

    if !schema.drops().is_empty() {
        let drops: Vec<String> = schema
            .drops()
            .iter()
            .map(|name| format!("DROP COLUMN {name}"))
            .collect();
        statements.push(format!("ALTER TABLE {table} {};", drops.join(",")));
    }

    statements.join("\n")
}

/// `DROP TABLE IF EXISTS <table>;`
pub fn drop_table(schema: &Schema) -> String {
    format!("DROP TABLE IF EXISTS {};", schema.table_name())
}

/// `name TYPE [PRIMARY KEY] [UNIQUE] [NOT NULL] [DEFAULT 'value']`
fn column_def(col: &Column) -> String {
    let mut def = format!("{} {}", col.name(), col.data_type().as_sql());
    if col.is_primary_key() {
        def.push_str(" PRIMARY KEY");
    }
    if col.is_unique() {
        def.push_str(" UNIQUE");
    }
    if !col.is_nullable() {
        def.push_str(" NOT NULL");
    }
    if let Some(value) = col.default() {
        def.push_str(" DEFAULT ");
        def.push_str(&value.to_literal());
    }
    def
}

fn foreign_key_def(fk: &Reference) -> String {
    format!(
        "FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
        fk.column(),
        fk.table(),
        fk.target(),
        fk.on_update.as_sql(),
        fk.on_delete.as_sql()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferenceAction;

    #[test]
    fn genres_create_matches_exactly() {
        let schema = Schema::create("genres", |t| {
            t.serial("id").auto_increment();
            t.string("name").unique();
            t.index(["id", "name"]);
        })
        .unwrap();
        assert_eq!(
            schema.to_sql(),
            "CREATE TABLE IF NOT EXISTS genres ( id SERIAL PRIMARY KEY UNIQUE NOT NULL,name VARCHAR UNIQUE NOT NULL );\nCREATE INDEX IF NOT EXISTS genres_indexes ON genres (id,name);\n"
        );
    }

    #[test]
    fn auto_increment_modifiers_appear_once_in_order() {
        let schema = Schema::create("t", |t| {
            t.integer("id").auto_increment().primary_key().unique().not_null();
        })
        .unwrap();
        let sql = create_table(&schema);
        for kw in ["PRIMARY KEY", "UNIQUE", "NOT NULL"] {
            assert_eq!(sql.matches(kw).count(), 1, "{kw} in {sql}");
        }
        let pk = sql.find("PRIMARY KEY").unwrap();
        let uq = sql.find("UNIQUE").unwrap();
        let nn = sql.find("NOT NULL").unwrap();
        assert!(pk < uq && uq < nn);
    }

    #[test]
    fn create_with_references_and_bookkeeping_columns() {
        let schema = Schema::create("books", |t| {
            t.numeric("id").auto_increment();
            t.string("name").not_null();
            t.uuid("author_id");
            t.timestamp();
            t.soft_delete();
            t.index(["name", "author_id"]);
            t.foreign("author_id")
                .on("authors")
                .references("id")
                .on_update(ReferenceAction::Cascade)
                .on_delete(ReferenceAction::Restrict);
        })
        .unwrap();
        assert_eq!(
            create_table(&schema),
            "CREATE TABLE IF NOT EXISTS books ( id SERIAL PRIMARY KEY UNIQUE NOT NULL,name VARCHAR NOT NULL,author_id UUID,created_at TIMESTAMP,updated_at TIMESTAMP,deleted_at TIMESTAMP, FOREIGN KEY (author_id) REFERENCES authors (id) ON UPDATE CASCADE ON DELETE RESTRICT );\n\
             CREATE INDEX IF NOT EXISTS books_indexes ON books (name,author_id);\n"
        );
    }

    #[test]
    fn create_with_table_keys_and_default() {
        let schema = Schema::create("tags", |t| {
            t.string("code");
            t.string("label").not_null().default_value("untitled");
            t.primary(["code"]);
            t.unique(["label"]);
        })
        .unwrap();
        assert_eq!(
            create_table(&schema),
            "CREATE TABLE IF NOT EXISTS tags ( code VARCHAR,label VARCHAR NOT NULL DEFAULT 'untitled', PRIMARY KEY(code), UNIQUE(label) );\n"
        );
    }

    #[test]
    fn default_literal_is_escaped() {
        let schema = Schema::create("t", |t| {
            t.text("note").default_value("it's");
        })
        .unwrap();
        assert!(create_table(&schema).contains("note TEXT DEFAULT 'it''s'"));
    }

    #[test]
    fn alter_groups_in_fixed_order() {
        let schema = Schema::table("authors", |t| {
            t.string("email").unique();
            t.big_integer("age").change();
            t.rename("name", "full_name");
            t.drop_columns(["nickname"]);
        })
        .unwrap();
        assert_eq!(
            alter_table(&schema),
            "ALTER TABLE authors ADD COLUMN IF NOT EXISTS email VARCHAR UNIQUE NOT NULL;\n\
             ALTER TABLE authors ALTER COLUMN age DROP DEFAULT,ALTER COLUMN age TYPE BIGINT USING age::BIGINT;\n\
             ALTER TABLE authors RENAME COLUMN name TO full_name;\n\
             ALTER TABLE authors DROP COLUMN nickname;"
        );
    }

    #[test]
    fn alter_skips_empty_groups() {
        let schema = Schema::table("t", |t| {
            t.drop_columns(["a", "b"]);
        })
        .unwrap();
        assert_eq!(render(&schema), "ALTER TABLE t DROP COLUMN a,DROP COLUMN b;");

        let only_changes = Schema::table("t", |t| {
            t.text("a").change();
        })
        .unwrap();
        assert!(!alter_table(&only_changes).contains("ADD COLUMN"));
    }

    #[test]
    fn each_rename_is_its_own_statement() {
        let schema = Schema::table("t", |t| {
            t.rename("a", "b");
            t.rename("c", "d");
        })
        .unwrap();
        assert_eq!(
            alter_table(&schema),
            "ALTER TABLE t RENAME COLUMN a TO b;\nALTER TABLE t RENAME COLUMN c TO d;"
        );
    }

    #[test]
    fn drop_renders_if_exists() {
        assert_eq!(
            render(&Schema::drop_table("genres").unwrap()),
            "DROP TABLE IF EXISTS genres;"
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let schema = Schema::table("t", |t| {
            t.timestamp();
            t.rename("a", "b");
            t.drop_soft_delete();
        })
        .unwrap();
        assert_eq!(render(&schema), render(&schema));
    }
}
