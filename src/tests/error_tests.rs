#[cfg(test)]
mod tests {
    use crate::error::{validation, AppError, ErrorKind, StoreError};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let error = AppError::BadRequest("Invalid input".to_string());
        assert_eq!(format!("{}", error), "Bad request: Invalid input");

        let error = AppError::Conflict("taken".to_string());
        assert_eq!(format!("{}", error), "Conflict: taken");

        let error = AppError::ValidationError {
            field: "email".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(format!("{}", error), "Validation error on field 'email': bad");
    }

    #[test]
    fn test_app_error_into_response() {
        let cases = [
            (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".to_string()), StatusCode::CONFLICT),
            (AppError::ServiceUnavailable("x".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Unauthorized("x".to_string()), StatusCode::UNAUTHORIZED),
            (AppError::MethodNotAllowed("x".to_string()), StatusCode::METHOD_NOT_ALLOWED),
            (AppError::RequestTimeout("x".to_string()), StatusCode::REQUEST_TIMEOUT),
            (AppError::Database("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_store_error_kinds() {
        assert_eq!(StoreError::BookAlreadyExists.kind(), ErrorKind::AlreadyExists);
        assert_eq!(StoreError::UserAlreadyExists.kind(), ErrorKind::AlreadyExists);
        assert_eq!(StoreError::BookNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::EmptyStore.kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::UserNotFound.kind(), ErrorKind::Unauthorized);
        assert_eq!(StoreError::InvalidPassword.kind(), ErrorKind::Unauthorized);
        assert_eq!(StoreError::Timeout.kind(), ErrorKind::Unavailable);
        assert_eq!(StoreError::from(sqlx::Error::PoolTimedOut).kind(), ErrorKind::Unavailable);
        assert_eq!(StoreError::from(sqlx::Error::RowNotFound).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_store_error_to_http_status() {
        let cases = [
            (StoreError::BookAlreadyExists, StatusCode::CONFLICT),
            (StoreError::UserAlreadyExists, StatusCode::CONFLICT),
            (StoreError::BookNotFound, StatusCode::NOT_FOUND),
            (StoreError::UserNotFound, StatusCode::UNAUTHORIZED),
            (StoreError::InvalidPassword, StatusCode::UNAUTHORIZED),
            (StoreError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::Hashing("bad salt".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(AppError::from(error).into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_store_error_messages_follow_variant() {
        let (status, body) = body_json(AppError::from(StoreError::UserAlreadyExists)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"]["message"].as_str().unwrap().contains("email"));

        let (status, body) = body_json(AppError::from(StoreError::BookAlreadyExists)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"]["message"].as_str().unwrap().contains("title and author"));

        let (status, body) = body_json(AppError::from(StoreError::EmptyStore)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "No books stored");

        let (_, wrong_password) = body_json(AppError::from(StoreError::InvalidPassword)).await;
        let (_, unknown_user) = body_json(AppError::from(StoreError::UserNotFound)).await;
        assert_eq!(wrong_password["error"]["message"], unknown_user["error"]["message"]);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_json(AppError::Conflict("A book with this title and author already exists".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["status"], 409);
        assert!(body["timestamp"].is_string());
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let (status, body) = body_json(AppError::Database("UNIQUE constraint failed: users.email".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = body.to_string();
        assert!(!text.contains("UNIQUE"));
        assert!(body["error"]["details"]["error_id"].is_string());

        let (_, body) = body_json(AppError::from(StoreError::Unavailable("pool closed at /var/db".into()))).await;
        assert!(!body.to_string().contains("/var/db"));
    }

    #[tokio::test]
    async fn test_validation_error_details() {
        let (status, body) = body_json(AppError::ValidationError {
            field: "written_at".to_string(),
            message: "not a month".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "written_at");
    }

    #[test]
    fn test_validation_helpers() {
        assert!(validation::validate_required("title", "title").is_ok());
        assert!(validation::validate_required("   ", "title").is_err());
        assert!(validation::validate_required("a\0b", "title").is_err());

        assert!(validation::validate_email("user@example.com").is_ok());
        assert!(validation::validate_email("user@localhost").is_err());
        assert!(validation::validate_email("@example.com").is_err());
        assert!(validation::validate_email("a b@example.com").is_err());

        assert!(validation::validate_password("secret", 6).is_ok());
        assert!(validation::validate_password("short", 6).is_err());

        assert!(validation::validate_range(30, 1, 150, "age").is_ok());
        assert!(validation::validate_range(0, 1, 150, "age").is_err());
        assert!(validation::validate_range(151, 1, 150, "age").is_err());
    }
}
