//! HTTP handlers.
//!
//! These handlers connect axum routes to the application services. Member
//! routes act on the caller named by `X-Authenticated-Email`; admin routes
//! take an [`AdminIdentity`] and pass it through for audit.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{
    ClubServices, CreateCycleCommand, CreateInvitationCommand, CreateMemberCommand,
    CreatePaymentCommand, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandlePaymentWebhookResult, RedeemCommand,
};
use crate::domain::foundation::{CycleId, MemberId, Timestamp};
use crate::domain::invitation::InvitationToken;
use crate::domain::member::ProfileUpdate;
use crate::domain::ClubError;
use crate::ports::PaymentGateway;

use super::dto::{
    AccessResponse, CreateCycleRequest, CreateInvitationRequest, CreateMemberRequest,
    CreatePaymentRequest, CycleQuery, CycleResponse, ExpiredInvitationsResponse,
    InvitationResponse, IssuedInvitationResponse, ListMembersQuery, MarkPaidOfflineRequest,
    MemberDuesResponse, MemberResponse, PaymentResponse, RedeemInvitationRequest,
    RedemptionResponse, UpdateStatusRequest, ValidateTokenRequest, WaiveDuesRequest,
    WebhookResponse,
};
use super::error::ApiError;
use super::identity::{AdminIdentity, CallerIdentity};

/// Header carrying the Stripe webhook signature.
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub services: ClubServices,
    pub webhooks: Arc<HandlePaymentWebhookHandler>,
}

impl AppState {
    pub fn new(services: ClubServices, gateway: Arc<dyn PaymentGateway>) -> Self {
        let webhooks = Arc::new(HandlePaymentWebhookHandler::new(
            gateway,
            services.ledger.clone(),
        ));
        Self { services, webhooks }
    }
}

fn parse_member_id(raw: &str) -> Result<MemberId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(ClubError::validation("member_id", "expected a UUID")))
}

fn parse_cycle_id(raw: &str) -> Result<CycleId, ApiError> {
    Ok(CycleId::parse(raw)?)
}

/// The requested cycle, or the active one.
async fn resolve_cycle(state: &AppState, requested: Option<String>) -> Result<CycleId, ApiError> {
    match requested {
        Some(raw) => parse_cycle_id(&raw),
        None => state
            .services
            .cycles
            .get_active_cycle()
            .await?
            .map(|c| c.id)
            .ok_or_else(|| ApiError(ClubError::not_found("cycle", "active"))),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Public Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/invitations/validate - Check a token without consuming it
pub async fn validate_invitation(
    State(state): State<AppState>,
    Json(req): Json<ValidateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = InvitationToken::from_raw(req.token);
    let invitation = state.services.invitations.validate_token(&token).await?;
    Ok(Json(InvitationResponse::from(invitation)))
}

/// POST /api/invitations/redeem - Redeem a token and start onboarding
pub async fn redeem_invitation(
    State(state): State<AppState>,
    Json(req): Json<RedeemInvitationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = InvitationToken::from_raw(req.token);
    let redemption = state
        .services
        .invitations
        .redeem(
            &token,
            RedeemCommand {
                first_name: req.first_name,
                last_name: req.last_name,
            },
        )
        .await?;

    let response = RedemptionResponse {
        invitation: InvitationResponse::from(redemption.invitation),
        member: MemberResponse::from(redemption.member),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/webhooks/stripe - Handle Stripe webhooks
///
/// Success for anything that needs no retry; 503 for transient failures so
/// Stripe redelivers.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError(ClubError::validation(
                "Stripe-Signature",
                "Missing Stripe-Signature header",
            ))
        })?;

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };
    let outcome = match state.webhooks.handle(cmd).await? {
        HandlePaymentWebhookResult::Reconciled { .. } => "reconciled",
        HandlePaymentWebhookResult::Replayed { .. } => "replayed",
        HandlePaymentWebhookResult::PaymentFailed { .. } => "payment_failed",
        HandlePaymentWebhookResult::UnknownSession { .. } => "unknown_session",
        HandlePaymentWebhookResult::Ignored { .. } => "ignored",
    };

    Ok(Json(WebhookResponse {
        received: true,
        outcome,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Member Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/access - Access decision for the caller
///
/// Fails secure: a decision that cannot be made is a denial.
pub async fn check_access(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> impl IntoResponse {
    match state.services.access.check_access(&caller.email).await {
        Ok(decision) => (StatusCode::OK, Json(AccessResponse::from(decision))),
        Err(err) => {
            tracing::error!(email = %caller.email, error = %err, "Access check failed, denying");
            (StatusCode::SERVICE_UNAVAILABLE, Json(AccessResponse::unavailable()))
        }
    }
}

/// GET /api/me - The caller's member record
pub async fn get_me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.services.members.get_by_email(&caller.email).await?;
    Ok(Json(MemberResponse::from(member)))
}

/// PUT /api/me/profile - Update the caller's profile
///
/// Completing the profile promotes a member whose dues are already settled.
pub async fn update_my_profile(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.services.members.get_by_email(&caller.email).await?;
    let updated = state.services.members.update_profile(&member.id, update).await?;
    let member = match state.services.ledger.promote_if_settled(&updated.id).await? {
        Some(promoted) => promoted,
        None => updated,
    };
    Ok(Json(MemberResponse::from(member)))
}

/// GET /api/me/dues - The caller's dues for a cycle (active by default)
pub async fn get_my_dues(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<CycleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.services.members.get_by_email(&caller.email).await?;
    let cycle_id = resolve_cycle(&state, query.cycle_id).await?;
    let dues = state.services.ledger.get_member_dues(&member.id, &cycle_id).await?;
    Ok(Json(MemberDuesResponse::from(dues)))
}

/// GET /api/me/payments - The caller's payments, newest first
pub async fn list_my_payments(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.services.members.get_by_email(&caller.email).await?;
    let payments = state.services.ledger.list_payments_for_member(&member.id).await?;
    Ok(Json(
        payments.into_iter().map(PaymentResponse::from).collect::<Vec<_>>(),
    ))
}

/// POST /api/me/payments - Record a checkout session for the active cycle
pub async fn create_my_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.services.members.get_by_email(&caller.email).await?;
    let cycle = state
        .services
        .cycles
        .get_active_cycle()
        .await?
        .ok_or_else(|| ApiError(ClubError::not_found("cycle", "active")))?;

    let payment = state
        .services
        .ledger
        .create_payment(CreatePaymentCommand {
            member_id: member.id,
            cycle_id: Some(cycle.id),
            email: member.email.as_str().to_string(),
            gateway_session_id: req.gateway_session_id,
            amount_cents: cycle.amount.amount_cents,
            currency: cycle.amount.currency.as_str().to_string(),
            description: req.description.or(Some(format!("Dues {}", cycle.label))),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Handlers: Invitations
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/invitations - Issue an invitation
pub async fn create_invitation(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = req.member_id.as_deref().map(parse_member_id).transpose()?;
    let issued = state
        .services
        .invitations
        .create_invitation(CreateInvitationCommand {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            created_by: admin.admin_id,
            member_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(IssuedInvitationResponse::from(issued))))
}

/// GET /api/admin/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let invitations = state.services.invitations.list_invitations().await?;
    Ok(Json(
        invitations
            .into_iter()
            .map(InvitationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/admin/invitations/expire - Expire every overdue invitation
pub async fn expire_invitations(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let expired = state.services.invitations.expire_old_invitations().await?;
    Ok(Json(ExpiredInvitationsResponse { expired }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Handlers: Members
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/members - Create a member directly
pub async fn create_member(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(req): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .services
        .members
        .create_member(CreateMemberCommand {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            status: req.status,
            is_admin: req.is_admin,
        })
        .await?;
    tracing::info!(member_id = %member.id, admin = %admin.admin_id, "Member created by admin");
    Ok((StatusCode::CREATED, Json(MemberResponse::from(member))))
}

/// GET /api/admin/members - All members, optionally filtered by status
pub async fn list_members(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Query(query): Query<ListMembersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let members = match query.status {
        Some(status) => state.services.members.list_by_status(status).await?,
        None => state.services.members.list_all().await?,
    };
    Ok(Json(
        members.into_iter().map(MemberResponse::from).collect::<Vec<_>>(),
    ))
}

/// GET /api/admin/members/:member_id
pub async fn get_member(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(member_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    let member = state.services.members.get_by_id(&member_id).await?;
    Ok(Json(MemberResponse::from(member)))
}

/// PUT /api/admin/members/:member_id/status - Move along the status machine
///
/// Leaving `Inactive` follows the reactivation dues check.
pub async fn update_member_status(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(member_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    let member = state
        .services
        .ledger
        .set_member_status(&member_id, req.status, admin.admin_id)
        .await?;
    Ok(Json(MemberResponse::from(member)))
}

/// POST /api/admin/members/:member_id/reactivate
pub async fn reactivate_member(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(member_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    let member = state
        .services
        .ledger
        .reactivate_member(&member_id, admin.admin_id)
        .await?;
    Ok(Json(MemberResponse::from(member)))
}

/// GET /api/admin/members/:member_id/dues - Dues for a cycle (active by default)
pub async fn get_member_dues(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(member_id): Path<String>,
    Query(query): Query<CycleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    let cycle_id = resolve_cycle(&state, query.cycle_id).await?;
    let dues = state.services.ledger.get_member_dues(&member_id, &cycle_id).await?;
    Ok(Json(MemberDuesResponse::from(dues)))
}

/// POST /api/admin/members/:member_id/dues/:cycle_id/paid-offline
pub async fn mark_dues_paid_offline(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path((member_id, cycle_id)): Path<(String, String)>,
    Json(req): Json<MarkPaidOfflineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    let cycle_id = parse_cycle_id(&cycle_id)?;
    let dues = state
        .services
        .ledger
        .mark_paid_offline(&member_id, &cycle_id, admin.admin_id, req.note)
        .await?;
    Ok(Json(MemberDuesResponse::from(dues)))
}

/// POST /api/admin/members/:member_id/dues/:cycle_id/waive
pub async fn waive_dues(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path((member_id, cycle_id)): Path<(String, String)>,
    Json(req): Json<WaiveDuesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    let cycle_id = parse_cycle_id(&cycle_id)?;
    let dues = state
        .services
        .ledger
        .waive(&member_id, &cycle_id, admin.admin_id, &req.reason)
        .await?;
    Ok(Json(MemberDuesResponse::from(dues)))
}

/// GET /api/admin/members/:member_id/payments
pub async fn list_member_payments(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(member_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = parse_member_id(&member_id)?;
    state.services.members.get_by_id(&member_id).await?;
    let payments = state.services.ledger.list_payments_for_member(&member_id).await?;
    Ok(Json(
        payments.into_iter().map(PaymentResponse::from).collect::<Vec<_>>(),
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Handlers: Cycles
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/cycles - Create an inactive cycle
pub async fn create_cycle(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(req): Json<CreateCycleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cycle = state
        .services
        .cycles
        .create_cycle(CreateCycleCommand {
            ending_year: req.ending_year,
            amount_cents: req.amount_cents,
            currency: req.currency,
            grace_days: req.grace_days,
            created_by: admin.admin_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CycleResponse::from(cycle))))
}

/// GET /api/admin/cycles - All cycles, newest first
pub async fn list_cycles(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let cycles = state.services.cycles.list_all().await?;
    Ok(Json(
        cycles.into_iter().map(CycleResponse::from).collect::<Vec<_>>(),
    ))
}

/// GET /api/admin/cycles/active
pub async fn get_active_cycle(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let cycle = state
        .services
        .cycles
        .get_active_cycle()
        .await?
        .ok_or_else(|| ApiError(ClubError::not_found("cycle", "active")))?;
    Ok(Json(CycleResponse::from(cycle)))
}

/// POST /api/admin/cycles/:cycle_id/activate
pub async fn activate_cycle(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(cycle_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cycle_id = parse_cycle_id(&cycle_id)?;
    let cycle = state.services.cycles.activate_cycle(&cycle_id).await?;
    tracing::info!(cycle_id = %cycle_id, admin = %admin.admin_id, "Cycle activated by admin");
    Ok(Json(CycleResponse::from(cycle)))
}

/// POST /api/admin/cycles/:cycle_id/deactivate
pub async fn deactivate_cycle(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(cycle_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cycle_id = parse_cycle_id(&cycle_id)?;
    let cycle = state.services.cycles.deactivate_cycle(&cycle_id).await?;
    tracing::info!(cycle_id = %cycle_id, admin = %admin.admin_id, "Cycle deactivated by admin");
    Ok(Json(CycleResponse::from(cycle)))
}

/// GET /api/admin/cycles/:cycle_id/dues - Every member's dues for the cycle
pub async fn list_cycle_dues(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(cycle_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cycle_id = parse_cycle_id(&cycle_id)?;
    let dues = state
        .services
        .ledger
        .list_member_dues_for_cycle(&cycle_id)
        .await?;
    Ok(Json(
        dues.into_values()
            .map(MemberDuesResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/admin/cycles/:cycle_id/overdue - Unsettled past the grace deadline
pub async fn list_overdue_dues(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(cycle_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cycle_id = parse_cycle_id(&cycle_id)?;
    let overdue = state
        .services
        .ledger
        .list_overdue(&cycle_id, Timestamp::now())
        .await?;
    Ok(Json(
        overdue
            .into_iter()
            .map(MemberDuesResponse::from)
            .collect::<Vec<_>>(),
    ))
}
