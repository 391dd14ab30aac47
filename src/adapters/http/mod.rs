//! HTTP adapter - axum routes over the application services.
//!
//! Identity comes from the `X-Authenticated-Email` header set by the
//! upstream auth proxy; admin routes additionally require an active admin.

pub mod dto;
mod error;
mod handlers;
mod identity;
mod routes;

pub use error::ApiError;
pub use handlers::AppState;
pub use identity::{AdminIdentity, CallerIdentity, IdentityRejection, AUTHENTICATED_EMAIL_HEADER};
pub use routes::{admin_routes, build_app, club_router, member_routes, public_routes, RouterOptions};
