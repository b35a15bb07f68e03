use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Middleware guarding the book mutation routes.
///
/// Accepts the token exactly as issued in the `Authorization` response header
/// of register/login, or with a `Bearer ` prefix. On success the caller's
/// `AuthUser` is inserted into the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("token is empty".to_string()))?;

    let user = state.tokens.verify(token).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized("invalid token".to_string())
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
