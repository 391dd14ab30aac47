//! Axum router configuration.
//!
//! # Routes
//!
//! ## Public
//! - `GET /health`
//! - `POST /api/invitations/validate` - Check a token without consuming it
//! - `POST /api/invitations/redeem` - Redeem a token
//! - `POST /api/webhooks/stripe` - Stripe webhooks (signature verified)
//!
//! ## Member (`X-Authenticated-Email`)
//! - `GET /api/access`
//! - `GET /api/me`, `PUT /api/me/profile`
//! - `GET /api/me/dues`, `GET|POST /api/me/payments`
//!
//! ## Admin (`AccessGate::is_admin`)
//! - `/api/admin/invitations[/expire]`
//! - `/api/admin/members[/:member_id[/status|/reactivate|/dues|/payments]]`
//! - `/api/admin/members/:member_id/dues/:cycle_id/{paid-offline,waive}`
//! - `/api/admin/cycles[/active|/:cycle_id/{activate,deactivate,dues,overdue}]`

use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    activate_cycle, check_access, create_cycle, create_invitation, create_member,
    create_my_payment, deactivate_cycle, expire_invitations, get_active_cycle, get_me,
    get_member, get_member_dues, get_my_dues, handle_stripe_webhook, health, list_cycle_dues,
    list_cycles, list_invitations, list_member_payments, list_members, list_my_payments,
    list_overdue_dues, mark_dues_paid_offline, reactivate_member, redeem_invitation,
    update_member_status, update_my_profile, validate_invitation, waive_dues, AppState,
};

/// Cross-cutting HTTP settings.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    /// Allowed browser origins; empty allows none.
    pub cors_origins: Vec<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

/// Unauthenticated routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/invitations/validate", post(validate_invitation))
        .route("/invitations/redeem", post(redeem_invitation))
        .route("/webhooks/stripe", post(handle_stripe_webhook))
}

/// Routes acting on the calling member.
pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/access", get(check_access))
        .route("/me", get(get_me))
        .route("/me/profile", put(update_my_profile))
        .route("/me/dues", get(get_my_dues))
        .route("/me/payments", get(list_my_payments).post(create_my_payment))
}

/// Admin routes, each guarded by the `AdminIdentity` extractor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Invitations
        .route("/invitations", get(list_invitations).post(create_invitation))
        .route("/invitations/expire", post(expire_invitations))
        // Members
        .route("/members", get(list_members).post(create_member))
        .route("/members/:member_id", get(get_member))
        .route("/members/:member_id/status", put(update_member_status))
        .route("/members/:member_id/reactivate", post(reactivate_member))
        .route("/members/:member_id/dues", get(get_member_dues))
        .route(
            "/members/:member_id/dues/:cycle_id/paid-offline",
            post(mark_dues_paid_offline),
        )
        .route("/members/:member_id/dues/:cycle_id/waive", post(waive_dues))
        .route("/members/:member_id/payments", get(list_member_payments))
        // Cycles
        .route("/cycles", get(list_cycles).post(create_cycle))
        .route("/cycles/active", get(get_active_cycle))
        .route("/cycles/:cycle_id/activate", post(activate_cycle))
        .route("/cycles/:cycle_id/deactivate", post(deactivate_cycle))
        .route("/cycles/:cycle_id/dues", get(list_cycle_dues))
        .route("/cycles/:cycle_id/overdue", get(list_overdue_dues))
}

/// Every route, without middleware or state.
pub fn club_router() -> Router<AppState> {
    Router::new().route("/health", get(health)).nest(
        "/api",
        public_routes()
            .merge(member_routes())
            .nest("/admin", admin_routes()),
    )
}

/// The full application: routes, middleware and state.
pub fn build_app(state: AppState, options: &RouterOptions) -> Router {
    club_router()
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(cors_layer(&options.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
