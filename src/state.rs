use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::purge::PurgeStatus;
use crate::service::{BookService, UserService};

/// The shared application state.
///
/// Cloned into every request handler by Axum; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub books: BookService,
    pub users: UserService,
    /// Issues and verifies bearer tokens.
    pub tokens: TokenKeys,
    /// The database pool when the SQLite backend is active; used by `/readyz`.
    pub db: Option<sqlx::SqlitePool>,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Live state of the purge scheduler.
    pub purge: PurgeStatus,
}

impl AppState {
    pub fn new(
        books: BookService,
        users: UserService,
        db: Option<sqlx::SqlitePool>,
        config: AppConfig,
        metrics: Metrics,
        purge: PurgeStatus,
    ) -> Self {
        Self {
            books,
            users,
            tokens: TokenKeys::new(&config.auth),
            db,
            config: Arc::new(config),
            metrics,
            purge,
        }
    }
}
