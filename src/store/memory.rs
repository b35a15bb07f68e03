use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::password;
use crate::store::{BookStore, IdentityStore};
use crate::types::{Book, Credentials, NewBook, NewUser, User};

/// In-memory implementation of `BookStore`.
///
/// Soft-deleted books stay in the map until `purge_deleted` runs, exactly like
/// rows in the SQLite store.
#[derive(Debug, Default, Clone)]
pub struct MemoryBookStore {
    books: Arc<RwLock<HashMap<Uuid, Book>>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self {
            books: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of physically stored records, soft-deleted ones included.
    pub async fn stored_count(&self) -> usize {
        self.books.read().await.len()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn add_book(&self, book: NewBook) -> StoreResult<Uuid> {
        // Held across check and insert so two identical adds cannot both pass.
        let mut books = self.books.write().await;

        let exists = books
            .values()
            .any(|b| !b.deleted && b.title == book.title && b.author == book.author);
        if exists {
            return Err(StoreError::BookAlreadyExists);
        }

        let id = Uuid::new_v4();
        books.insert(id, book.into_book(id));

        tracing::debug!(book_id = %id, "Stored book");
        Ok(id)
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        let mut active: Vec<Book> = books.values().filter(|b| !b.deleted).cloned().collect();
        if active.is_empty() {
            return Err(StoreError::EmptyStore);
        }
        active.sort_by(|a, b| (&a.title, &a.author).cmp(&(&b.title, &b.author)));
        Ok(active)
    }

    async fn get_book(&self, id: Uuid) -> StoreResult<Book> {
        let books = self.books.read().await;
        books
            .get(&id)
            .filter(|b| !b.deleted)
            .cloned()
            .ok_or(StoreError::BookNotFound)
    }

    async fn mark_deleted(&self, id: Uuid) -> StoreResult<bool> {
        let mut books = self.books.write().await;
        let book = books.get_mut(&id).ok_or(StoreError::BookNotFound)?;
        if book.deleted {
            return Ok(false);
        }
        book.deleted = true;
        Ok(true)
    }

    async fn purge_deleted(&self) -> StoreResult<u64> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|_, b| !b.deleted);
        let removed = (before - books.len()) as u64;
        tracing::debug!(removed, "Purged deleted books from memory");
        Ok(removed)
    }
}

/// In-memory implementation of `IdentityStore`.
#[derive(Debug, Default, Clone)]
pub struct MemoryIdentityStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn register(&self, user: NewUser) -> StoreResult<Uuid> {
        // Fast rejection before paying for the hash; re-checked under the write lock.
        if self.users.read().await.values().any(|u| u.email == user.email) {
            return Err(StoreError::UserAlreadyExists);
        }

        let password_hash = password::hash_password_blocking(user.password).await?;

        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UserAlreadyExists);
        }

        let id = Uuid::new_v4();
        users.insert(
            id,
            User {
                id,
                email: user.email,
                password_hash,
                name: user.name,
                age: user.age,
            },
        );

        tracing::debug!(user_id = %id, "Stored user");
        Ok(id)
    }

    async fn authenticate(&self, credentials: Credentials) -> StoreResult<Uuid> {
        let (id, hash) = {
            let users = self.users.read().await;
            let user = users
                .values()
                .find(|u| u.email == credentials.email)
                .ok_or(StoreError::UserNotFound)?;
            (user.id, user.password_hash.clone())
        };

        if password::verify_password_blocking(credentials.password, hash).await? {
            Ok(id)
        } else {
            Err(StoreError::InvalidPassword)
        }
    }
}
