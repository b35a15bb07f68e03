//! HTTP route handlers for the Bookly API.
//!
//! - `books`: list, fetch, add and soft-delete books
//! - `health`: liveness, readiness, metrics and version endpoints
//! - `users`: registration and login, both answering with a bearer token

pub mod books;
pub mod health;
pub mod users;

use axum::{
    http::{Method, Uri},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::error::AppError;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

/// Builds the application router. Adding and deleting books requires a token;
/// everything else is public.
pub fn router(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), require_auth);

    let books_root = get(books::list_books).merge(post(books::add_book).route_layer(auth.clone()));
    let book_by_id = get(books::get_book).merge(axum::routing::delete(books::delete_book).route_layer(auth));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/version", get(health::version))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/books", books_root.clone())
        .route("/books/", books_root)
        .route("/books/{id}", book_by_id)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("{} is not supported on {}", method, uri.path()))
}
