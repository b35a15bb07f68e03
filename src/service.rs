use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreResult;
use crate::purge::PurgeQueue;
use crate::store::{BookStore, IdentityStore};
use crate::types::{Book, Credentials, NewBook, NewUser};

/// Book operations as seen by the HTTP layer.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
    purge_queue: PurgeQueue,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>, purge_queue: PurgeQueue) -> Self {
        Self { store, purge_queue }
    }

    pub async fn add_book(&self, book: NewBook) -> StoreResult<Uuid> {
        self.store.add_book(book).await
    }

    pub async fn list_books(&self) -> StoreResult<Vec<Book>> {
        self.store.list_books().await
    }

    pub async fn get_book(&self, id: Uuid) -> StoreResult<Book> {
        self.store.get_book(id).await
    }

    /// Soft-deletes the book and queues one purge signal if it was not
    /// already flagged.
    pub async fn delete_book(&self, id: Uuid) -> StoreResult<()> {
        if self.store.mark_deleted(id).await? {
            self.purge_queue.notify();
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn IdentityStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, user: NewUser) -> StoreResult<Uuid> {
        self.store.register(user).await
    }

    pub async fn login(&self, credentials: Credentials) -> StoreResult<Uuid> {
        self.store.authenticate(credentials).await
    }
}
