//! Invitation status state machine.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an invitation. `Used` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Sent,
    Used,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Sent => "sent",
            InvitationStatus::Used => "used",
            InvitationStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sent" => Ok(InvitationStatus::Sent),
            "used" => Ok(InvitationStatus::Used),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown invitation status '{}'", other),
            )),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for InvitationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use InvitationStatus::*;
        matches!((self, target), (Sent, Used) | (Sent, Expired))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use InvitationStatus::*;
        match self {
            Sent => vec![Used, Expired],
            Used | Expired => vec![],
        }
    }
}
