//! Caller identity extractors.
//!
//! An upstream auth proxy authenticates the caller and forwards the
//! verified email in `X-Authenticated-Email`. This module only reads it:
//!
//! ```text
//! proxy → X-Authenticated-Email → CallerIdentity  (any caller)
//!                               → AdminIdentity   (AccessGate::is_admin)
//! ```
//!
//! Admin checks fail secure: if the decision cannot be made the request is
//! rejected.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::foundation::AdminId;

use super::dto::ErrorResponse;
use super::handlers::AppState;

/// Header carrying the authenticated caller's email.
pub const AUTHENTICATED_EMAIL_HEADER: &str = "x-authenticated-email";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub email: String,
}

/// A caller that `AccessGate` confirmed as an active admin.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub email: String,
    /// Audit identity recorded on admin writes.
    pub admin_id: AdminId,
}

/// Rejection type for identity extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRejection {
    /// No usable identity header.
    Unauthenticated,
    /// Authenticated but not an active admin.
    Forbidden,
    /// The admin check itself failed.
    Unavailable,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            IdentityRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_REQUIRED",
                "Authentication is required",
            ),
            IdentityRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                "UNAUTHORIZED",
                "Administrator identity required",
            ),
            IdentityRejection::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ACCESS_CHECK_UNAVAILABLE",
                "Access could not be verified",
            ),
        };
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

fn header_email(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHENTICATED_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_email(parts)
            .map(|email| CallerIdentity { email })
            .ok_or(IdentityRejection::Unauthenticated)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = IdentityRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let email = header_email(parts).ok_or(IdentityRejection::Unauthenticated)?;

        match state.services.access.is_admin(&email).await {
            Ok(true) => {
                let admin_id =
                    AdminId::new(email.to_ascii_lowercase()).map_err(|_| IdentityRejection::Forbidden)?;
                Ok(AdminIdentity { email, admin_id })
            }
            Ok(false) => {
                tracing::warn!(email = %email, "Admin route denied");
                Err(IdentityRejection::Forbidden)
            }
            Err(err) => {
                tracing::error!(email = %email, error = %err, "Admin check failed, denying");
                Err(IdentityRejection::Unavailable)
            }
        }
    }
}
