//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → Health check endpoint (public)
//! - `/events` → Check-in, officer overrides and event admin views (authenticated)

use crate::routes::{events::events_routes, health::health_routes};
use crate::state::AppState;
use axum::Router;

pub mod events;
pub mod health;

/// Builds the complete application router for all HTTP endpoints, with
/// `app_state` already applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/events", events_routes(app_state.clone()))
        .with_state(app_state)
}
