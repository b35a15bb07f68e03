//! Integration and unit tests for the Bookly application.
//!
//! ## Test Modules
//!
//! - **store_tests**: the `BookStore` / `IdentityStore` contract, run against both implementations
//! - **purge_tests**: deferred purge scheduler state machine and loop
//! - **api_tests**: HTTP endpoints end to end
//! - **error_tests**: error taxonomy and HTTP error rendering
//! - **config_tests**: configuration loading and validation
//! - **db_tests**: SQLite schema and persistence details
//!
//! Individual test modules can be run with:
//! ```bash
//! cargo test store_tests
//! cargo test purge_tests
//! # etc.
//! ```

pub mod config_tests;
pub mod error_tests;

use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};
use tempfile::TempDir;

use crate::config::{AppConfig, DatabaseConfig};
use crate::types::{NewBook, NewUser};

pub(crate) const TEST_JWT_SECRET: &str = "bookly-test-signing-secret-0123456789abcdef";

/// Embedded defaults plus the signing secret they deliberately lack.
pub(crate) fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config
}

/// Takes the database write lock on a separate connection and keeps it until
/// `release_write_lock`. Writers on other connections wait on it.
pub(crate) async fn hold_write_lock(pool: &SqlitePool) -> PoolConnection<Sqlite> {
    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await.unwrap();
    conn
}

pub(crate) async fn release_write_lock(mut conn: PoolConnection<Sqlite>) {
    sqlx::query("ROLLBACK").execute(&mut *conn).await.unwrap();
}

/// Opens a fresh SQLite database in a temporary directory. Keep the returned
/// `TempDir` alive for as long as the pool is used.
pub(crate) async fn sqlite_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("bookly-test.db").display()),
        max_connections: 4,
        query_timeout_secs: 5,
    };
    let pool = crate::db::connect(&cfg).await.unwrap();
    (pool, dir)
}

pub(crate) fn new_book(title: &str, author: &str) -> NewBook {
    NewBook {
        title: title.to_string(),
        author: author.to_string(),
        description: format!("{} by {}", title, author),
        written_at: NaiveDate::from_ymd_opt(1954, 7, 1).unwrap(),
    }
}

pub(crate) fn new_user(email: &str, password: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password: password.to_string(),
        name: "Test Reader".to_string(),
        age: 30,
    }
}
