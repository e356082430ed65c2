//! `/events/{event_id}/...` routes.
//!
//! Members check in, file edit requests and absence applications, and read
//! their own status. Everything else requires the caller to be an event admin
//! of the event's generation.

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};

use crate::auth::guards::{allow_authenticated, allow_event_admin};
use crate::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use common::ChangeStatusReq;
pub use get::{
    current_code, list_abuse_flags, list_absence_applications, list_edit_requests, member_log,
    my_absence_application, my_attendance, my_edit_request,
};
pub use post::{
    approve_absence_application, approve_edit_request, attend_all, check_in,
    reject_absence_application, reject_edit_request, submit_absence_application,
    submit_edit_request,
};
pub use put::change_status;

pub fn events_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{event_id}/attendance", post(check_in).route_layer(from_fn(allow_authenticated)))
        .route("/{event_id}/attendance", put(change_status).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/attendance/all", post(attend_all).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/attendance/me", get(my_attendance).route_layer(from_fn(allow_authenticated)))
        .route("/{event_id}/attendance/{member_id}/log", get(member_log).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/code", get(current_code).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/abuse-flags", get(list_abuse_flags).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/edit-requests", post(submit_edit_request).route_layer(from_fn(allow_authenticated)))
        .route("/{event_id}/edit-requests", get(list_edit_requests).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/edit-requests/me", get(my_edit_request).route_layer(from_fn(allow_authenticated)))
        .route("/{event_id}/edit-requests/{request_id}/approve", post(approve_edit_request).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/edit-requests/{request_id}/reject", post(reject_edit_request).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/absence-applications", post(submit_absence_application).route_layer(from_fn(allow_authenticated)))
        .route("/{event_id}/absence-applications", get(list_absence_applications).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/absence-applications/me", get(my_absence_application).route_layer(from_fn(allow_authenticated)))
        .route("/{event_id}/absence-applications/{application_id}/approve", post(approve_absence_application).route_layer(from_fn_with_state(app_state.clone(), allow_event_admin)))
        .route("/{event_id}/absence-applications/{application_id}/reject", post(reject_absence_application).route_layer(from_fn_with_state(app_state, allow_event_admin)))
}
