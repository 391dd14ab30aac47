//! Service-level error taxonomy.
//!
//! Every application service returns `ClubError`. Ports return
//! `DomainError`, which converts via `From`.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | AlreadyUsed | 410 |
//! | Expired | 410 |
//! | Unauthorized | 403 |
//! | IllegalTransition | 409 |
//! | ValidationFailed | 400 |
//! | InvalidWebhookSignature | 400 |
//! | StoreUnavailable | 503 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by the membership and dues services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClubError {
    /// Lookup by id, email, token, or session found nothing.
    NotFound { entity: &'static str, key: String },

    /// Duplicate email, cycle id, or gateway session.
    Conflict { entity: &'static str, key: String },

    /// Invitation was already redeemed.
    AlreadyUsed,

    /// Invitation passed its expiry.
    Expired,

    /// Admin-only operation without an admin identity.
    Unauthorized,

    /// Status change not permitted by the state machine.
    IllegalTransition { from: String, to: String },

    /// Input rejected before touching the store.
    ValidationFailed { field: String, message: String },

    /// Payment gateway callback failed signature verification.
    InvalidWebhookSignature,

    /// Transient infrastructure failure.
    StoreUnavailable(String),
}

impl ClubError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        ClubError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, key: impl ToString) -> Self {
        ClubError::Conflict {
            entity,
            key: key.to_string(),
        }
    }

    pub fn illegal_transition(from: impl ToString, to: impl ToString) -> Self {
        ClubError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ClubError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        ClubError::StoreUnavailable(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ClubError::NotFound { entity, .. } => match *entity {
                "invitation" => ErrorCode::InvitationNotFound,
                "cycle" => ErrorCode::CycleNotFound,
                "payment" => ErrorCode::PaymentNotFound,
                _ => ErrorCode::MemberNotFound,
            },
            ClubError::Conflict { entity, .. } => match *entity {
                "invitation" => ErrorCode::InvitationExists,
                "cycle" => ErrorCode::CycleExists,
                "payment" => ErrorCode::PaymentExists,
                _ => ErrorCode::MemberExists,
            },
            ClubError::AlreadyUsed => ErrorCode::InvitationAlreadyUsed,
            ClubError::Expired => ErrorCode::InvitationExpired,
            ClubError::Unauthorized => ErrorCode::Unauthorized,
            ClubError::IllegalTransition { .. } => ErrorCode::InvalidStateTransition,
            ClubError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ClubError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            ClubError::StoreUnavailable(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a developer-facing error message.
    pub fn message(&self) -> String {
        match self {
            ClubError::NotFound { entity, key } => format!("No {} found for '{}'", entity, key),
            ClubError::Conflict { entity, key } => format!("A {} already exists for '{}'", entity, key),
            ClubError::AlreadyUsed => "Invitation has already been used".to_string(),
            ClubError::Expired => "Invitation has expired".to_string(),
            ClubError::Unauthorized => "Administrator identity required".to_string(),
            ClubError::IllegalTransition { from, to } => {
                format!("Cannot move from {} to {}", from, to)
            }
            ClubError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ClubError::InvalidWebhookSignature => "Invalid webhook signature".to_string(),
            ClubError::StoreUnavailable(msg) => format!("Store unavailable: {}", msg),
        }
    }

    /// Only transient store failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClubError::StoreUnavailable(_))
    }
}

impl std::fmt::Display for ClubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ClubError {}

fn entity_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::InvitationNotFound | ErrorCode::InvitationExists => "invitation",
        ErrorCode::CycleNotFound | ErrorCode::CycleExists => "cycle",
        ErrorCode::PaymentNotFound | ErrorCode::PaymentExists => "payment",
        _ => "member",
    }
}

impl From<DomainError> for ClubError {
    fn from(err: DomainError) -> Self {
        let key = err.detail("key").unwrap_or(&err.message).to_string();
        match err.code {
            ErrorCode::MemberNotFound
            | ErrorCode::InvitationNotFound
            | ErrorCode::CycleNotFound
            | ErrorCode::PaymentNotFound => ClubError::NotFound {
                entity: entity_for(err.code),
                key,
            },
            ErrorCode::MemberExists
            | ErrorCode::CycleExists
            | ErrorCode::PaymentExists
            | ErrorCode::InvitationExists => ClubError::Conflict {
                entity: entity_for(err.code),
                key,
            },
            ErrorCode::InvitationAlreadyUsed => ClubError::AlreadyUsed,
            ErrorCode::InvitationExpired => ClubError::Expired,
            ErrorCode::InvalidStateTransition => ClubError::IllegalTransition {
                from: err.detail("from").unwrap_or("unknown").to_string(),
                to: err.detail("to").unwrap_or("unknown").to_string(),
            },
            ErrorCode::ValidationFailed => ClubError::ValidationFailed {
                field: err.detail("field").unwrap_or("unknown").to_string(),
                message: err.message,
            },
            ErrorCode::Unauthorized => ClubError::Unauthorized,
            ErrorCode::InvalidWebhookSignature => ClubError::InvalidWebhookSignature,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                ClubError::StoreUnavailable(err.message)
            }
        }
    }
}

impl From<ValidationError> for ClubError {
    fn from(err: ValidationError) -> Self {
        ClubError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ClubError> for DomainError {
    fn from(err: ClubError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
