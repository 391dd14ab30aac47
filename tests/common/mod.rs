//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use club_dues::adapters::http::{build_app, AppState, RouterOptions};
use club_dues::adapters::memory::InMemoryStore;
use club_dues::adapters::stripe::{StripeConfig, StripeWebhookGateway};
use club_dues::application::services::{CreateCycleCommand, CreateMemberCommand, CycleDefaults};
use club_dues::application::{ClubServices, Repositories};
use club_dues::domain::dues::Cycle;
use club_dues::domain::foundation::AdminId;
use club_dues::domain::member::{Member, MemberStatus};

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const ADMIN_EMAIL: &str = "admin@club.org";

/// Services over a fresh in-memory store.
pub fn services() -> ClubServices {
    services_with_store().1
}

/// Services plus the store behind them, for failure injection.
pub fn services_with_store() -> (Arc<InMemoryStore>, ClubServices) {
    let store = Arc::new(InMemoryStore::new());
    let services = ClubServices::new(
        Repositories::shared(store.clone()),
        7,
        CycleDefaults::default(),
    );
    (store, services)
}

pub fn admin() -> AdminId {
    AdminId::new("admin_1").unwrap()
}

pub async fn active_cycle(services: &ClubServices, ending_year: i32) -> Cycle {
    let cycle = services
        .cycles
        .create_cycle(CreateCycleCommand {
            ending_year,
            amount_cents: 8500,
            currency: Some("USD".to_string()),
            grace_days: None,
            created_by: admin(),
        })
        .await
        .unwrap();
    services.cycles.activate_cycle(&cycle.id).await.unwrap()
}

pub async fn member(services: &ClubServices, email: &str, status: MemberStatus) -> Member {
    services
        .members
        .create_member(CreateMemberCommand {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            status: Some(status),
            is_admin: false,
        })
        .await
        .unwrap()
}

/// Full router over `services`, with an active admin seeded.
pub async fn app(services: ClubServices) -> axum::Router {
    services
        .members
        .ensure_admin(ADMIN_EMAIL, "Club", "Admin")
        .await
        .unwrap();
    let gateway = StripeWebhookGateway::new(StripeConfig::new(WEBHOOK_SECRET));
    build_app(
        AppState::new(services, Arc::new(gateway)),
        &RouterOptions::default(),
    )
}

/// A `checkout.session.*` event body for `session_id`.
pub fn checkout_event(event_type: &str, session_id: &str, payment_status: &str) -> String {
    serde_json::json!({
        "id": format!("evt_{}", session_id),
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": payment_status,
                "status": "complete",
                "payment_intent": "pi_integration",
                "mode": "payment",
                "metadata": {}
            }
        }
    })
    .to_string()
}
