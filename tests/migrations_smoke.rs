use sqlx::Row;

// Runs only when a database is explicitly configured via DATABASE_URL or
// POSTGRES_SERVER; otherwise the test is a no-op so plain `cargo test`
// stays green on machines without Postgres.
fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();

    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Some(url);
        }
    }

    let server = std::env::var("POSTGRES_SERVER").ok().filter(|value| !value.trim().is_empty())?;
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
    let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| "proviasuperuser".into());
    let password = std::env::var("POSTGRES_PASSWORD").unwrap_or_default();
    let db = std::env::var("POSTGRES_DB").unwrap_or_else(|_| "provia_db".into());

    Some(format!("postgresql://{user}:{password}@{server}:{port}/{db}"))
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("skipping: DATABASE_URL and POSTGRES_SERVER are not set");
        return Ok(());
    };

    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url).await?;

    let migrations_dir =
        std::env::var("PROVIA_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    let tables = [
        "schools",
        "users",
        "class_groups",
        "subjects",
        "teacher_classes",
        "teacher_class_subjects",
        "templates",
        "provas",
        "questions",
        "prova_images",
        "ai_analyses",
        "coordination_reviews",
        "school_policies",
        "jobs",
        "audit_log",
    ];

    for table in tables {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    Ok(())
}
