use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::password;
use crate::store::{BookStore, IdentityStore};
use crate::types::{month_format, Book, Credentials, NewBook, NewUser};

/// Runs a store call under `deadline`; an elapsed deadline fails the call.
/// Dropping an unfinished transaction rolls it back.
async fn bounded<T, F>(deadline: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(res) => res.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn decode_error(msg: String) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(msg.into()))
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| decode_error(format!("invalid stored id '{}': {}", raw, e)))
}

fn row_to_book(row: &SqliteRow) -> StoreResult<Book> {
    let bid: String = row.try_get("bid")?;
    let written_at: String = row.try_get("written_at")?;
    let written_at = month_format::parse(&written_at)
        .ok_or_else(|| decode_error(format!("invalid stored month '{}'", written_at)))?;
    Ok(Book {
        id: parse_id(&bid)?,
        title: row.try_get("label")?,
        author: row.try_get("author")?,
        description: row.try_get("description")?,
        written_at,
        deleted: row.try_get::<i64, _>("deleted")? != 0,
    })
}

/// SQLite-backed `BookStore`.
#[derive(Debug, Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn add_book(&self, book: NewBook) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        // Check and insert in one statement; SQLite serializes writers.
        let insert = sqlx::query(
            r#"INSERT INTO books (bid, label, author, description, written_at, deleted)
               SELECT ?1, ?2, ?3, ?4, ?5, 0
               WHERE NOT EXISTS (
                   SELECT 1 FROM books WHERE label = ?2 AND author = ?3 AND deleted = 0
               )"#,
        )
        .bind(id.to_string())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(month_format::format(&book.written_at))
        .execute(&self.pool);

        let result = match tokio::time::timeout(self.timeout, insert).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if is_unique_violation(&e) => return Err(StoreError::BookAlreadyExists),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to insert book");
                return Err(e.into());
            }
            Err(_) => return Err(StoreError::Timeout),
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::BookAlreadyExists);
        }
        Ok(id)
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let rows = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bid, label, author, description, written_at, deleted FROM books
                 WHERE deleted = 0 ORDER BY label, author",
            )
            .fetch_all(&self.pool),
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to load books"))?;

        if rows.is_empty() {
            return Err(StoreError::EmptyStore);
        }
        rows.iter().map(row_to_book).collect()
    }

    async fn get_book(&self, id: Uuid) -> StoreResult<Book> {
        let row = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bid, label, author, description, written_at, deleted FROM books
                 WHERE bid = ?1 AND deleted = 0",
            )
            .bind(id.to_string())
            .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => row_to_book(&row),
            None => Err(StoreError::BookNotFound),
        }
    }

    async fn mark_deleted(&self, id: Uuid) -> StoreResult<bool> {
        let result = bounded(
            self.timeout,
            sqlx::query("UPDATE books SET deleted = 1 WHERE bid = ?1 AND deleted = 0")
                .bind(id.to_string())
                .execute(&self.pool),
        )
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing flipped: either already deleted or unknown.
        let exists: Option<i64> = bounded(
            self.timeout,
            sqlx::query_scalar("SELECT deleted FROM books WHERE bid = ?1")
                .bind(id.to_string())
                .fetch_optional(&self.pool),
        )
        .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::BookNotFound),
        }
    }

    async fn purge_deleted(&self) -> StoreResult<u64> {
        let pool = self.pool.clone();
        bounded(self.timeout, async move {
            let mut tx = pool.begin().await?;
            let result = sqlx::query("DELETE FROM books WHERE deleted = 1")
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(result.rows_affected())
        })
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Purge transaction failed"))
    }
}

/// SQLite-backed `IdentityStore`.
#[derive(Debug, Clone)]
pub struct SqliteIdentityStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteIdentityStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn register(&self, user: NewUser) -> StoreResult<Uuid> {
        let taken: Option<String> = bounded(
            self.timeout,
            sqlx::query_scalar("SELECT uid FROM users WHERE email = ?1")
                .bind(&user.email)
                .fetch_optional(&self.pool),
        )
        .await?;
        if taken.is_some() {
            return Err(StoreError::UserAlreadyExists);
        }

        let password_hash = password::hash_password_blocking(user.password).await?;
        let id = Uuid::new_v4();

        // The unique index on email decides concurrent registrations.
        let insert = sqlx::query(
            "INSERT INTO users (uid, name, email, pass_hash, age) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(i64::from(user.age))
        .execute(&self.pool);

        match tokio::time::timeout(self.timeout, insert).await {
            Ok(Ok(_)) => Ok(id),
            Ok(Err(e)) if is_unique_violation(&e) => Err(StoreError::UserAlreadyExists),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to insert user");
                Err(e.into())
            }
            Err(_) => Err(StoreError::Timeout),
        }
    }

    async fn authenticate(&self, credentials: Credentials) -> StoreResult<Uuid> {
        let row = bounded(
            self.timeout,
            sqlx::query("SELECT uid, pass_hash FROM users WHERE email = ?1")
                .bind(&credentials.email)
                .fetch_optional(&self.pool),
        )
        .await?;

        let row = row.ok_or(StoreError::UserNotFound)?;
        let uid: String = row.try_get("uid")?;
        let hash: String = row.try_get("pass_hash")?;

        if password::verify_password_blocking(credentials.password, hash).await? {
            parse_id(&uid)
        } else {
            Err(StoreError::InvalidPassword)
        }
    }
}
