use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, BoxError, Router};
use tower::ServiceBuilder;

use crate::error::AppError;

/// Bounds every request by `timeout`. An elapsed deadline answers 408 with
/// the usual JSON error body.
pub fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .timeout(timeout),
    )
}

async fn handle_timeout_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request exceeded the server deadline");
        AppError::RequestTimeout("The request took too long to complete".to_string())
    } else {
        AppError::Internal(anyhow::anyhow!("unhandled middleware error: {}", err))
    }
}
