use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error;
use std::fmt;

/// Error classes shared by every store implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    /// Malformed requests; raised by the HTTP layer, never by a store.
    InvalidInput,
    Unauthorized,
    Unavailable,
    Internal,
}

/// Errors returned by `BookStore` and `IdentityStore` implementations.
///
/// Both the in-memory and the SQLite stores report the same variants for the
/// same situations, so callers can match on them without knowing the backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("book already exists")]
    BookAlreadyExists,
    #[error("book storage is empty")]
    EmptyStore,
    #[error("book not found")]
    BookNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("user does not exist")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
    #[error("store call exceeded its deadline")]
    Timeout,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::BookNotFound | StoreError::EmptyStore => ErrorKind::NotFound,
            StoreError::BookAlreadyExists | StoreError::UserAlreadyExists => ErrorKind::AlreadyExists,
            StoreError::UserNotFound | StoreError::InvalidPassword => ErrorKind::Unauthorized,
            StoreError::Timeout | StoreError::Unavailable(_) => ErrorKind::Unavailable,
            StoreError::Database(_) | StoreError::Hashing(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The primary error type for the HTTP layer.
///
/// Every variant renders as the same structured JSON payload; internal
/// details are logged, never returned to the client.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// For when a requested resource is not found.
    NotFound(String),
    /// For when a request conflicts with the current state of the server.
    Conflict(String),
    /// For when a backend is temporarily unavailable or timed out.
    ServiceUnavailable(String),
    /// For errors related to database operations.
    Database(String),
    /// For when the path exists but not for the request method.
    MethodNotAllowed(String),
    /// For when the request did not complete within the server's deadline.
    RequestTimeout(String),
    /// For when a request is not authorized.
    Unauthorized(String),
    /// For when a specific field in a request fails validation.
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::MethodNotAllowed(msg) => write!(f, "Method not allowed: {}", msg),
            AppError::RequestTimeout(msg) => write!(f, "Request timeout: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The service is temporarily unavailable".to_string(),
                    None,
                )
            }
            AppError::Database(msg) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", msg, None),
            AppError::RequestTimeout(msg) => (StatusCode::REQUEST_TIMEOUT, "REQUEST_TIMEOUT", msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

// Status follows the error class; the message is chosen per variant.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err.kind() {
            ErrorKind::AlreadyExists => AppError::Conflict(match err {
                StoreError::UserAlreadyExists => "A user with this email is already registered".to_string(),
                _ => "A book with this title and author already exists".to_string(),
            }),
            ErrorKind::NotFound => AppError::NotFound(match err {
                StoreError::EmptyStore => "No books stored".to_string(),
                _ => "Book not found".to_string(),
            }),
            // Same message for every credential failure so a caller cannot tell which emails exist.
            ErrorKind::Unauthorized => AppError::Unauthorized("Invalid email or password".to_string()),
            ErrorKind::InvalidInput => AppError::BadRequest(err.to_string()),
            ErrorKind::Unavailable => AppError::ServiceUnavailable(err.to_string()),
            ErrorKind::Internal => match err {
                StoreError::Database(e) => AppError::Database(e.to_string()),
                other => AppError::Internal(anyhow::Error::new(other)),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// A module containing helper functions for request validation.
pub mod validation {
    use super::*;

    /// Validates that a required text field is present and not blank.
    pub fn validate_required(value: &str, field: &str) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: "Value must not be empty".to_string(),
            });
        }
        if value.contains('\0') {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: "Value contains null characters".to_string(),
            });
        }
        Ok(())
    }

    /// Validates the shape of an email address: one `@` with text on both
    /// sides and a dot in the domain part.
    pub fn validate_email(email: &str) -> AppResult<()> {
        validate_required(email, "email")?;
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(AppError::ValidationError {
                field: "email".to_string(),
                message: format!("'{}' is not a valid email address", email),
            });
        }
        Ok(())
    }

    /// Validates that a password has at least `min_len` characters.
    pub fn validate_password(password: &str, min_len: usize) -> AppResult<()> {
        if password.chars().count() < min_len {
            return Err(AppError::ValidationError {
                field: "password".to_string(),
                message: format!("Password must be at least {} characters", min_len),
            });
        }
        Ok(())
    }

    /// Validates that a number lies in `min..=max`.
    pub fn validate_range(value: u32, min: u32, max: u32, field: &str) -> AppResult<()> {
        if value < min || value > max {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: format!("Value must be between {} and {}, got {}", min, max, value),
            });
        }
        Ok(())
    }
}
