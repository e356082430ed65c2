use crate::auth::claims::AuthUser;
use crate::response::{ApiResponse, Empty, ErrorResponse, error_body};
use crate::state::AppState;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::event;
use sea_orm::EntityTrait;
use services::{AttendanceError, membership_gate};
use std::collections::HashMap;

/// Extracts and validates the user from the request, and inserts it into the request extensions.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), ErrorResponse> {
    let (mut parts, body) = req.into_parts();

    let user = AuthUser::from_request_parts(&mut parts, &()).await?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(req: Request<Body>, next: Next) -> Result<Response, ErrorResponse> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Guard for routes under `/events/{event_id}` that only event admins may use.
///
/// The caller must hold a current membership in the event's generation
/// whose role grants `MANAGE_EVENTS`. On success the caller's
/// [`MemberContext`](services::membership_gate::MemberContext) is added to
/// the request extensions next to the [`AuthUser`].
pub async fn allow_event_admin(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let (mut req, user) = extract_and_insert_authuser(req).await?;

    let event_id = params
        .get("event_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<Empty>::error("Missing or invalid event_id")),
        ))?;

    let event = event::Entity::find_by_id(event_id)
        .one(app_state.db())
        .await
        .map_err(|e| error_body(&AttendanceError::Database(e)))?
        .ok_or_else(|| error_body(&AttendanceError::NotFound("Event")))?;

    let member = membership_gate::require_event_admin(app_state.db(), user.0.sub, event.generation_id)
        .await
        .map_err(|e| {
            tracing::debug!(user_id = user.0.sub, event_id, code = e.code(), "event admin check refused");
            error_body(&e)
        })?;

    req.extensions_mut().insert(member);
    Ok(next.run(req).await)
}
