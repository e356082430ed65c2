use axum::{
    Extension, Json,
    extract::{Path, State},
    response::Response,
};

use super::common::ChangeStatusReq;
use crate::auth::AuthUser;
use crate::response::{error_response, ok};
use crate::state::AppState;
use services::attendance_override::AttendanceOverrideService;

/// PUT /api/events/{event_id}/attendance
///
/// Sets a member's status on the caller's authority. The change is appended
/// as a modified row naming the caller, and the member is notified. Setting
/// the status the member already has changes nothing.
///
/// ### Request Body
/// ```json
/// { "member_id": 12, "status": "PRESENT" }
/// ```
///
/// ### Responses
/// - `200 OK` with `{ "attendance": {...}, "changed": true }`
/// - `403 Forbidden` if the caller is not an event admin
/// - `404 Not Found` if the event or member does not exist
pub async fn change_status(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<ChangeStatusReq>,
) -> Response {
    match AttendanceOverrideService::change_status(
        state.db(),
        state.notifier(),
        state.settings(),
        claims.sub,
        event_id,
        body.member_id,
        body.status,
    )
    .await
    {
        Ok(outcome) if outcome.changed => ok(outcome, "Attendance updated"),
        Ok(outcome) => ok(outcome, "Attendance unchanged"),
        Err(e) => error_response(&e),
    }
}
