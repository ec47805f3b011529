//! HTTP error response conversion

use crate::error::ResourceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::EmptyFile
            | ResourceError::ContentTypeMismatch { .. }
            | ResourceError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ResourceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ResourceError::Forbidden => StatusCode::FORBIDDEN,
            ResourceError::NotFound(_) => StatusCode::NOT_FOUND,
            ResourceError::Conflict(_) => StatusCode::CONFLICT,
            ResourceError::DeleteFailed(_) => StatusCode::BAD_GATEWAY,
            ResourceError::Storage(_)
            | ResourceError::Registry(_)
            | ResourceError::Messaging(_)
            | ResourceError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::EmptyFile
            | ResourceError::ContentTypeMismatch { .. }
            | ResourceError::InvalidUpload(_) => "bad_request",
            ResourceError::Unauthenticated => "unauthenticated",
            ResourceError::Forbidden => "forbidden",
            ResourceError::NotFound(_) => "not_found",
            ResourceError::Conflict(_) => "conflict",
            ResourceError::DeleteFailed(_) => "static_resource_delete_failed",
            ResourceError::Storage(_)
            | ResourceError::Registry(_)
            | ResourceError::Messaging(_)
            | ResourceError::Directory(_) => "internal_error",
        }
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            e if e.is_client_error() => {
                tracing::debug!(error = %e, status = status.as_u16(), "request rejected");
                e.to_string()
            }
            ResourceError::DeleteFailed(_) => {
                tracing::warn!(error = %self, "artifact cleanup failed");
                self.to_string()
            }
            _ => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse::new(message, self.error_code()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(ResourceError::EmptyFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ResourceError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ResourceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ResourceError::NotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ResourceError::Conflict(id).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ResourceError::DeleteFailed(id).error_code(),
            "static_resource_delete_failed"
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let error = ResourceError::Registry(RegistryError::Backend("redis at 10.0.0.3 down".into()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.code, "internal_error");
        assert!(!body.error.contains("10.0.0.3"));
    }
}
