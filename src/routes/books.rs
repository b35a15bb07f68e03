use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{validation, AppError, AppResult, StoreError},
    state::AppState,
    types::{month_format, CreateBookRequest, CreateBookResponse, NewBook},
};

// Unknown and malformed ids both answer 204, like a missing book.
fn parse_book_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

pub async fn list_books(State(state): State<AppState>) -> AppResult<Response> {
    match state.books.list_books().await {
        Ok(books) => Ok((StatusCode::OK, Json(books)).into_response()),
        Err(StoreError::EmptyStore) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    let Some(id) = parse_book_id(&id) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    match state.books.get_book(id).await {
        Ok(book) => Ok((StatusCode::OK, Json(book)).into_response()),
        Err(StoreError::BookNotFound) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn add_book(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;

    validation::validate_required(&req.title, "title")?;
    validation::validate_required(&req.author, "author")?;
    let written_at = month_format::parse(&req.written_at).ok_or_else(|| AppError::ValidationError {
        field: "written_at".to_string(),
        message: format!("'{}' is not a month in YYYY-MM format", req.written_at),
    })?;

    let book = NewBook {
        title: req.title,
        author: req.author,
        description: req.description,
        written_at,
    };
    let id = state.books.add_book(book).await?;

    state.metrics.inc_books_added();
    tracing::info!(book_id = %id, user_id = %user.user_id, "Book added");
    Ok((StatusCode::CREATED, Json(CreateBookResponse { id })).into_response())
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(id) = parse_book_id(&id) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    match state.books.delete_book(id).await {
        Ok(()) => {
            state.metrics.inc_books_deleted();
            tracing::info!(book_id = %id, user_id = %user.user_id, "Book marked deleted");
            Ok((StatusCode::OK, Json(json!({ "id": id, "deleted": true }))).into_response())
        }
        Err(StoreError::BookNotFound) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e.into()),
    }
}
