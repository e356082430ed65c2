use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use services::absence::{AbsenceApplicationBody, AbsenceService};
use services::attendance_override::AttendanceOverrideService;
use services::check_in::{CheckInRequest, CheckInService};
use services::edit_request::{EditRequestBody, EditRequestService};

use crate::auth::AuthUser;
use crate::response::{ApiResponse, error_response, ok};
use crate::state::AppState;

/// POST /api/events/{event_id}/attendance
///
/// Records a scan of the code currently displayed at the event. The status
/// (`PRESENT`, `LATE` or `ABSENT`) follows from when the scan arrives.
///
/// ### Request Body
/// ```json
/// {
///   "code": "Gzg3uULSVP",
///   "latitude": 37.56,
///   "longitude": 126.97,
///   "device_id": "b1f0c0de",
///   "device_model": "Pixel 8"
/// }
/// ```
/// Only `code` is required.
///
/// ### Responses
/// - `201 Created` with the stored attendance
/// - `400 Bad Request` (`INVALID_CODE`, `NOT_OPEN_YET`)
/// - `403 Forbidden` (`NOT_REGISTERED_CLUB`, `WAITING_FOR_APPROVAL`)
/// - `404 Not Found` (event)
/// - `409 Conflict` (`ALREADY_CHECKED_IN`)
pub async fn check_in(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CheckInRequest>,
) -> Response {
    match CheckInService::check_in(state.db(), state.settings(), claims.sub, event_id, &body, Utc::now()).await {
        Ok(view) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(view, "Attendance recorded")),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/events/{event_id}/attendance/all
///
/// Marks every current member of the event's generation `PRESENT`. Members
/// already present are left alone. A member whose row cannot be written is
/// reported under `failures` and the rest are still marked; everyone who
/// changed gets one batched notification.
///
/// ### Response: 200 OK
/// ```json
/// {
///   "success": true,
///   "data": {
///     "changed": [ { "membership_id": 4, "status": "PRESENT", ... } ],
///     "unchanged": 2,
///     "failures": [ { "membership_id": 7, "code": "INTERNAL", "message": "..." } ]
///   },
///   "message": "Marked 1 member(s) present"
/// }
/// ```
pub async fn attend_all(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match AttendanceOverrideService::attend_all(
        state.db(),
        state.notifier(),
        state.settings(),
        claims.sub,
        event_id,
    )
    .await
    {
        Ok(report) => {
            let message = format!("Marked {} member(s) present", report.changed.len());
            ok(report, &message)
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/events/{event_id}/edit-requests
///
/// Asks the event's officers to correct the caller's attendance.
///
/// ### Request Body
/// ```json
/// { "reason": "The scanner froze", "status": "PRESENT" }
/// ```
/// `status` defaults to `PRESENT`.
///
/// ### Responses
/// - `201 Created` with the pending request
/// - `400 Bad Request` (`INVALID_REQUEST`)
/// - `403 Forbidden` (`NOT_REGISTERED_CLUB`, `WAITING_FOR_APPROVAL`)
pub async fn submit_edit_request(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<EditRequestBody>,
) -> Response {
    match EditRequestService::submit(state.db(), claims.sub, event_id, &body).await {
        Ok(request) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(request, "Edit request submitted")),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/events/{event_id}/edit-requests/{request_id}/approve
///
/// Records the requested status as an officer override and notifies the
/// member. Returns the reviewed request with the resulting attendance.
///
/// ### Responses
/// - `200 OK`
/// - `404 Not Found` (event, request)
/// - `409 Conflict` (`ALREADY_REVIEWED`)
pub async fn approve_edit_request(
    State(state): State<AppState>,
    Path((event_id, request_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match EditRequestService::approve(
        state.db(),
        state.notifier(),
        state.settings(),
        claims.sub,
        event_id,
        request_id,
    )
    .await
    {
        Ok(review) => ok(review, "Edit request approved"),
        Err(e) => error_response(&e),
    }
}

/// POST /api/events/{event_id}/edit-requests/{request_id}/reject
pub async fn reject_edit_request(
    State(state): State<AppState>,
    Path((event_id, request_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match EditRequestService::reject(
        state.db(),
        state.notifier(),
        state.settings(),
        claims.sub,
        event_id,
        request_id,
    )
    .await
    {
        Ok(review) => ok(review, "Edit request rejected"),
        Err(e) => error_response(&e),
    }
}

/// POST /api/events/{event_id}/absence-applications
///
/// Tells the officers ahead of time that the caller will be absent or late.
/// Everyone who manages attendance is notified.
///
/// ### Request Body
/// ```json
/// { "reason": "Exam week", "status": "ABSENT" }
/// ```
/// `status` defaults to `ABSENT`.
pub async fn submit_absence_application(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<AbsenceApplicationBody>,
) -> Response {
    match AbsenceService::submit(
        state.db(),
        state.notifier(),
        state.settings(),
        claims.sub,
        event_id,
        &body,
    )
    .await
    {
        Ok(application) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(application, "Absence application submitted")),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/events/{event_id}/absence-applications/{application_id}/approve
pub async fn approve_absence_application(
    State(state): State<AppState>,
    Path((event_id, application_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    review_absence_application(state, event_id, application_id, claims.sub, true).await
}

/// POST /api/events/{event_id}/absence-applications/{application_id}/reject
pub async fn reject_absence_application(
    State(state): State<AppState>,
    Path((event_id, application_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    review_absence_application(state, event_id, application_id, claims.sub, false).await
}

async fn review_absence_application(
    state: AppState,
    event_id: i64,
    application_id: i64,
    actor_user_id: i64,
    approve: bool,
) -> Response {
    match AbsenceService::review(
        state.db(),
        state.notifier(),
        state.settings(),
        actor_user_id,
        event_id,
        application_id,
        approve,
    )
    .await
    {
        Ok(application) if approve => ok(application, "Absence application approved"),
        Ok(application) => ok(application, "Absence application rejected"),
        Err(e) => error_response(&e),
    }
}
