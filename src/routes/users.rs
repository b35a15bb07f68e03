use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    error::{validation, AppError, AppResult, StoreError},
    state::AppState,
    types::{Credentials, NewUser, UserTokenResponse},
};

/// 201 with the token in the `Authorization` header and the user id in the body.
fn token_response(state: &AppState, user_id: Uuid) -> AppResult<Response> {
    let token = state
        .tokens
        .issue(user_id)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("failed to issue token")))?;
    Ok((
        StatusCode::CREATED,
        [(header::AUTHORIZATION, token)],
        Json(UserTokenResponse { user_id }),
    )
        .into_response())
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<Response> {
    let Json(user) = payload?;

    validation::validate_email(&user.email)?;
    validation::validate_password(&user.password, state.config.auth.min_password_len)?;
    validation::validate_required(&user.name, "name")?;
    validation::validate_range(user.age, 1, 150, "age")?;

    let user_id = state.users.register(user).await.map_err(|e| {
        tracing::warn!(error = %e, "User registration failed");
        AppError::from(e)
    })?;

    state.metrics.inc_users_registered();
    tracing::info!(user_id = %user_id, "User registered");
    token_response(&state, user_id)
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Response> {
    let Json(credentials) = payload?;

    validation::validate_required(&credentials.email, "email")?;
    validation::validate_required(&credentials.password, "password")?;

    let user_id = match state.users.login(credentials).await {
        Ok(id) => id,
        Err(e @ (StoreError::UserNotFound | StoreError::InvalidPassword)) => {
            state.metrics.inc_logins_failed();
            tracing::info!(reason = %e, "Login rejected");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user_id, "User logged in");
    token_response(&state, user_id)
}
