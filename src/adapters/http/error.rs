//! Maps service errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::foundation::ValidationError;
use crate::domain::ClubError;

use super::dto::ErrorResponse;

/// API error type that converts service errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub ClubError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ClubError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClubError::Conflict { .. } | ClubError::IllegalTransition { .. } => StatusCode::CONFLICT,
            ClubError::AlreadyUsed | ClubError::Expired => StatusCode::GONE,
            ClubError::Unauthorized => StatusCode::FORBIDDEN,
            ClubError::ValidationFailed { .. } | ClubError::InvalidWebhookSignature => {
                StatusCode::BAD_REQUEST
            }
            ClubError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ClubError> for ApiError {
    fn from(err: ClubError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(ClubError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code().to_string();
        let body = match &self.0 {
            ClubError::ValidationFailed { field, message } => ErrorResponse::with_details(
                code,
                message.clone(),
                serde_json::json!({ "field": field }),
            ),
            ClubError::IllegalTransition { from, to } => ErrorResponse::with_details(
                code,
                self.0.message(),
                serde_json::json!({ "from": from, "to": to }),
            ),
            // Store details stay in the logs.
            ClubError::StoreUnavailable(detail) => {
                tracing::error!(error = %detail, "Request failed on store");
                ErrorResponse::new(code, "Service temporarily unavailable")
            }
            other => ErrorResponse::new(code, other.message()),
        };
        (status, Json(body)).into_response()
    }
}
