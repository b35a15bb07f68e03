//! Storage capabilities and their implementations.
//!
//! Services depend only on the [`BookStore`] and [`IdentityStore`] traits.
//! Two implementations satisfy both identically:
//!
//! - [`memory`]: maps behind a `tokio::sync::RwLock`, for development and as
//!   the fallback when no database is reachable
//! - [`sqlite`]: SQLx over a pooled SQLite database, every call bounded by a
//!   deadline
//!
//! Uniqueness of `(title, author)` only considers books that are not soft
//! deleted, so a pair can be added again as soon as the previous book was
//! marked deleted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::StorageBackend;
use crate::error::StoreResult;
use crate::types::{Book, Credentials, NewBook, NewUser};

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryBookStore, MemoryIdentityStore};
pub use sqlite::{SqliteBookStore, SqliteIdentityStore};

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Stores a new book and returns its generated id.
    ///
    /// Fails with `BookAlreadyExists` when an active book with the same
    /// title and author exists. The check and the insert are atomic.
    async fn add_book(&self, book: NewBook) -> StoreResult<Uuid>;

    /// Returns all active books, or `EmptyStore` when there are none.
    async fn list_books(&self) -> StoreResult<Vec<Book>>;

    /// Returns the active book with `id`, or `BookNotFound`.
    async fn get_book(&self, id: Uuid) -> StoreResult<Book>;

    /// Flags the book as deleted. Returns `false` when it already was, in
    /// which case nothing changes; an unknown id is `BookNotFound`.
    async fn mark_deleted(&self, id: Uuid) -> StoreResult<bool>;

    /// Physically removes every book flagged deleted, all or nothing.
    /// Returns the number of removed records.
    async fn purge_deleted(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Hashes the password and stores the user. Fails with
    /// `UserAlreadyExists` when the email is taken.
    async fn register(&self, user: NewUser) -> StoreResult<Uuid>;

    /// Returns the id of the user whose email and password match.
    async fn authenticate(&self, credentials: Credentials) -> StoreResult<Uuid>;
}

/// The stores backing a running server, plus the pool when SQLite is used.
pub struct Stores {
    pub books: Arc<dyn BookStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub pool: Option<SqlitePool>,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            books: Arc::new(MemoryBookStore::new()),
            identities: Arc::new(MemoryIdentityStore::new()),
            pool: None,
        }
    }

    pub fn sqlite(pool: SqlitePool, timeout: Duration) -> Self {
        Self {
            books: Arc::new(SqliteBookStore::new(pool.clone(), timeout)),
            identities: Arc::new(SqliteIdentityStore::new(pool.clone(), timeout)),
            pool: Some(pool),
        }
    }

    /// Opens the configured backend. With `fallback_to_memory`, a database
    /// that cannot be opened degrades to the in-memory stores.
    pub async fn open(cfg: &crate::config::AppConfig) -> anyhow::Result<Self> {
        match cfg.storage.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory stores");
                Ok(Self::memory())
            }
            StorageBackend::Sqlite => match crate::db::connect(&cfg.database).await {
                Ok(pool) => {
                    tracing::info!(url = %cfg.database.url, "Using SQLite stores");
                    Ok(Self::sqlite(pool, cfg.database.query_timeout()))
                }
                Err(e) if cfg.storage.fallback_to_memory => {
                    tracing::error!(error = %e, "Failed to open database, falling back to in-memory stores");
                    Ok(Self::memory())
                }
                Err(e) => Err(e),
            },
        }
    }
}
