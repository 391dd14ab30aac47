//! HTTP DTOs (Data Transfer Objects) for the club API.
//!
//! Request and response shapes at the boundary between HTTP and the
//! application layer. Token hashes never leave the server; the raw
//! invitation token is returned exactly once, on creation.

use serde::{Deserialize, Serialize};

use crate::application::IssuedInvitation;
use crate::domain::access::{AccessDecision, DenialReason};
use crate::domain::dues::{Cycle, DuesStatus, MemberDues, Payment, PaymentStatus};
use crate::domain::foundation::Timestamp;
use crate::domain::invitation::{Invitation, InvitationStatus};
use crate::domain::member::{DuesSummary, Member, MemberProfile, MemberStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to invite someone by email.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Existing member to attach the invitation to.
    #[serde(default)]
    pub member_id: Option<String>,
}

/// A raw invitation token presented by an invitee.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

/// Request to redeem an invitation.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemInvitationRequest {
    pub token: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request to create a member directly.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub status: Option<MemberStatus>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMembersQuery {
    #[serde(default)]
    pub status: Option<MemberStatus>,
}

/// Selects a cycle; the active cycle when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycleQuery {
    #[serde(default)]
    pub cycle_id: Option<String>,
}

/// Request to create a billing cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCycleRequest {
    /// Calendar year in which the fiscal year ends.
    pub ending_year: i32,
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub grace_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkPaidOfflineRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaiveDuesRequest {
    pub reason: String,
}

/// Records a checkout session opened for the caller's dues.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub gateway_session_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Member record as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub status: MemberStatus,
    pub is_admin: bool,
    pub profile: MemberProfile,
    pub dues_summary: Option<DuesSummaryResponse>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub invited_at: Option<Timestamp>,
    pub profile_completed_at: Option<Timestamp>,
}

impl From<Member> for MemberResponse {
    fn from(m: Member) -> Self {
        Self {
            id: m.id.to_string(),
            email: m.email.as_str().to_string(),
            first_name: m.first_name,
            last_name: m.last_name,
            full_name: m.full_name,
            status: m.status,
            is_admin: m.is_admin,
            profile: m.profile,
            dues_summary: m.dues_summary.map(DuesSummaryResponse::from),
            created_at: m.created_at,
            updated_at: m.updated_at,
            invited_at: m.invited_at,
            profile_completed_at: m.profile_completed_at,
        }
    }
}

/// Cached dues status carried on the member record.
#[derive(Debug, Clone, Serialize)]
pub struct DuesSummaryResponse {
    pub cycle_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub paid: bool,
    pub paid_at: Option<Timestamp>,
}

impl From<DuesSummary> for DuesSummaryResponse {
    fn from(s: DuesSummary) -> Self {
        Self {
            cycle_id: s.cycle_id.as_str().to_string(),
            amount_cents: s.amount.amount_cents,
            currency: s.amount.currency.as_str().to_string(),
            paid: s.paid,
            paid_at: s.paid_at,
        }
    }
}

/// Invitation without its token hash.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: InvitationStatus,
    pub member_id: Option<String>,
    pub created_by: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
}

impl From<Invitation> for InvitationResponse {
    fn from(i: Invitation) -> Self {
        Self {
            id: i.id.to_string(),
            email: i.email.as_str().to_string(),
            first_name: i.first_name,
            last_name: i.last_name,
            status: i.status,
            member_id: i.member_id.map(|m| m.to_string()),
            created_by: i.created_by.as_str().to_string(),
            created_at: i.created_at,
            expires_at: i.expires_at,
            used_at: i.used_at,
        }
    }
}

/// A freshly issued invitation, with the raw token to deliver to the invitee.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvitationResponse {
    pub invitation: InvitationResponse,
    pub token: String,
}

impl From<IssuedInvitation> for IssuedInvitationResponse {
    fn from(issued: IssuedInvitation) -> Self {
        Self {
            token: issued.token.expose().to_string(),
            invitation: InvitationResponse::from(issued.invitation),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedemptionResponse {
    pub invitation: InvitationResponse,
    pub member: MemberResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiredInvitationsResponse {
    pub expired: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleResponse {
    pub id: String,
    pub label: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub amount_cents: i64,
    pub currency: String,
    pub is_active: bool,
    pub grace_days: u32,
    pub grace_deadline: Timestamp,
    pub created_by: String,
}

impl From<Cycle> for CycleResponse {
    fn from(c: Cycle) -> Self {
        Self {
            grace_deadline: c.grace_deadline(),
            id: c.id.as_str().to_string(),
            label: c.label,
            start_date: c.start_date,
            end_date: c.end_date,
            amount_cents: c.amount.amount_cents,
            currency: c.amount.currency.as_str().to_string(),
            is_active: c.is_active,
            grace_days: c.grace_days,
            created_by: c.created_by.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDuesResponse {
    pub member_id: String,
    pub cycle_id: String,
    pub status: DuesStatus,
    pub settled: bool,
    pub paid_at: Option<Timestamp>,
    pub paid_offline_at: Option<Timestamp>,
    pub waived_at: Option<Timestamp>,
    pub payment_ref: Option<String>,
    pub note: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: Option<Timestamp>,
}

impl From<MemberDues> for MemberDuesResponse {
    fn from(d: MemberDues) -> Self {
        Self {
            settled: d.is_settled(),
            member_id: d.member_id.to_string(),
            cycle_id: d.cycle_id.as_str().to_string(),
            status: d.status,
            paid_at: d.paid_at,
            paid_offline_at: d.paid_offline_at,
            waived_at: d.waived_at,
            payment_ref: d.payment_ref.map(|p| p.to_string()),
            note: d.note,
            updated_by: d.updated_by.map(|a| a.as_str().to_string()),
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub member_id: String,
    pub cycle_id: Option<String>,
    pub gateway_session_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id.to_string(),
            member_id: p.member_id.to_string(),
            cycle_id: p.cycle_id.map(|c| c.as_str().to_string()),
            gateway_session_id: p.gateway_session_id.as_str().to_string(),
            amount_cents: p.amount.amount_cents,
            currency: p.amount.currency.as_str().to_string(),
            status: p.status,
            description: p.description,
            created_at: p.created_at,
            paid_at: p.paid_at,
        }
    }
}

/// Access decision for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    pub has_access: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    /// User-facing explanation of a denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberResponse>,
}

impl AccessResponse {
    /// Denial used when the decision itself could not be made.
    pub fn unavailable() -> Self {
        Self {
            has_access: false,
            is_admin: false,
            reason: None,
            message: Some("Access could not be verified. Please try again later.".to_string()),
            member: None,
        }
    }
}

impl From<AccessDecision> for AccessResponse {
    fn from(d: AccessDecision) -> Self {
        Self {
            is_admin: d.is_admin(),
            has_access: d.has_access,
            message: d.reason.map(|r| r.user_message().to_string()),
            reason: d.reason,
            member: d.member.map(MemberResponse::from),
        }
    }
}

/// Outcome of a webhook delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: &'static str,
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
