use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

use crate::config::{self, DatabaseConfig};

/// Creates the database file if needed, opens a pool and initializes the schema.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let db_url = &cfg.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.query_timeout())
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA busy_timeout=5000;").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;

    init_db(&pool).await?;
    Ok(pool)
}

/// One-shot schema setup. Safe to run on every start.
pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }

    // users table
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            uid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            pass_hash TEXT NOT NULL,
            age INTEGER NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    // books table; deleted rows stay until the purge scheduler removes them
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS books (
            bid TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            author TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            written_at TEXT NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0
        )"#,
    )
    .execute(pool)
    .await?;

    // Uniqueness indexes are part of the contract and must exist.
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_books_active_label_author ON books(label, author) WHERE deleted = 0",
    )
    .execute(pool)
    .await?;

    if let Err(e) = sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_deleted ON books(deleted)")
        .execute(pool)
        .await
    {
        tracing::warn!("Failed to create index idx_books_deleted: {}", e);
    }

    Ok(())
}
