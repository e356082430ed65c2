use axum::{
    Extension,
    extract::{Path, State},
    response::Response,
};
use chrono::Utc;
use services::absence::AbsenceService;
use services::attendance_query::AttendanceQueryService;
use services::edit_request::EditRequestService;

use crate::auth::AuthUser;
use crate::response::{error_response, ok};
use crate::state::AppState;

/// GET /api/events/{event_id}/attendance/me
///
/// The caller's latest attendance for the event, or a synthetic `UNCHECKED`
/// entry when nothing has been recorded yet.
pub async fn my_attendance(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match AttendanceQueryService::my_attendance(state.db(), claims.sub, event_id).await {
        Ok(view) => ok(view, "Attendance retrieved"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/attendance/{member_id}/log
///
/// The member's latest officer override and latest own scan, side by side.
///
/// ### Response: 200 OK
/// ```json
/// {
///   "success": true,
///   "data": {
///     "membership_id": 12,
///     "username": "xia",
///     "modified": { "status": "PRESENT", "modifier_name": "yan", ... },
///     "unmodified": { "status": "LATE", ... }
///   },
///   "message": "Attendance log retrieved"
/// }
/// ```
pub async fn member_log(
    State(state): State<AppState>,
    Path((event_id, member_id)): Path<(i64, i64)>,
) -> Response {
    match AttendanceQueryService::member_log(state.db(), event_id, member_id).await {
        Ok(log) => ok(log, "Attendance log retrieved"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/code
///
/// The code to display right now, the second it was generated for, and how
/// many seconds it stays acceptable. Displays poll this once per second.
pub async fn current_code(State(state): State<AppState>, Path(event_id): Path<i64>) -> Response {
    match AttendanceQueryService::current_code(state.db(), state.settings(), event_id, Utc::now()).await {
        Ok(code) => ok(code, "Code generated"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/abuse-flags
///
/// Shared-device flags raised on the event's attendance rows, newest first.
pub async fn list_abuse_flags(State(state): State<AppState>, Path(event_id): Path<i64>) -> Response {
    match AttendanceQueryService::list_abuse_flags(state.db(), event_id).await {
        Ok(flags) => ok(flags, "Abuse flags retrieved"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/edit-requests
///
/// Every edit request filed for the event, oldest first.
pub async fn list_edit_requests(State(state): State<AppState>, Path(event_id): Path<i64>) -> Response {
    match EditRequestService::list_for_event(state.db(), event_id).await {
        Ok(requests) => ok(requests, "Edit requests retrieved"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/edit-requests/me
pub async fn my_edit_request(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match EditRequestService::latest_mine(state.db(), claims.sub, event_id).await {
        Ok(request) => ok(request, "Edit request retrieved"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/absence-applications
pub async fn list_absence_applications(State(state): State<AppState>, Path(event_id): Path<i64>) -> Response {
    match AbsenceService::list_for_event(state.db(), event_id).await {
        Ok(applications) => ok(applications, "Absence applications retrieved"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/events/{event_id}/absence-applications/me
///
/// The caller's latest absence application, with its review state.
pub async fn my_absence_application(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match AbsenceService::latest_mine(state.db(), claims.sub, event_id).await {
        Ok(application) => ok(application, "Absence application retrieved"),
        Err(e) => error_response(&e),
    }
}
