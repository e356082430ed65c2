//! Member-filed attendance corrections and their review.
//!
//! Approving a request applies the requested status through the override
//! path in the same transaction that marks the request approved. The member
//! gets one review notification instead of the generic status-change one.

use crate::attendance_override::AttendanceOverrideService;
use crate::attendance_query::{AttendanceView, find_event, find_event_membership};
use crate::error::{AttendanceError, AttendanceResult};
use crate::membership_gate;
use crate::notification::{Notification, NotificationSender};
use crate::settings::AttendanceSettings;
use db::models::attendance::AttendanceStatus;
use db::models::edit_request::{self, RequestState};
use db::models::event;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};

/// Body of a new edit request.
#[derive(Debug, Clone, Deserialize)]
pub struct EditRequestBody {
    pub reason: String,
    #[serde(default = "requested_default")]
    pub status: AttendanceStatus,
}

fn requested_default() -> AttendanceStatus {
    AttendanceStatus::Present
}

/// A reviewed request and, when approved, the attendance it produced.
#[derive(Debug, Clone, Serialize)]
pub struct EditRequestReview {
    pub request: edit_request::Model,
    pub attendance: Option<AttendanceView>,
}

/// Trims the reason and refuses requests that could never be applied.
pub(crate) fn validate(reason: &str, status: AttendanceStatus) -> AttendanceResult<&str> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AttendanceError::InvalidRequest("A reason is required"));
    }
    if status == AttendanceStatus::Unchecked {
        return Err(AttendanceError::InvalidRequest(
            "The requested status must be PRESENT, LATE or ABSENT",
        ));
    }
    Ok(reason)
}

pub struct EditRequestService;

impl EditRequestService {
    pub async fn submit(
        db: &DatabaseConnection,
        user_id: i64,
        event_id: i64,
        body: &EditRequestBody,
    ) -> AttendanceResult<edit_request::Model> {
        let event = find_event(db, event_id).await?;
        let reason = validate(&body.reason, body.status)?;
        let member = membership_gate::require_member(db, user_id, event.generation_id).await?;

        let request =
            edit_request::Model::create(db, event.id, member.membership_id(), reason, body.status)
                .await?;
        tracing::info!(
            event_id = event.id,
            membership_id = member.membership_id(),
            request_id = request.id,
            status = %body.status,
            "edit request submitted"
        );
        Ok(request)
    }

    /// The caller's most recent request for the event.
    pub async fn latest_mine<C>(
        db: &C,
        user_id: i64,
        event_id: i64,
    ) -> AttendanceResult<edit_request::Model>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        let member = membership_gate::require_member(db, user_id, event.generation_id).await?;
        edit_request::Model::latest_for(db, event.id, member.membership_id())
            .await?
            .ok_or(AttendanceError::NotFound("Edit request"))
    }

    pub async fn list_for_event<C>(
        db: &C,
        event_id: i64,
    ) -> AttendanceResult<Vec<edit_request::Model>>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        Ok(edit_request::Model::for_event(db, event.id).await?)
    }

    /// Approves a pending request and records the requested status on the
    /// reviewer's authority.
    pub async fn approve(
        db: &DatabaseConnection,
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        actor_user_id: i64,
        event_id: i64,
        request_id: i64,
    ) -> AttendanceResult<EditRequestReview> {
        let (event, request) = Self::find_pending(db, event_id, request_id).await?;
        let actor = AttendanceOverrideService::resolve_actor(db, actor_user_id, &event).await?;
        let target = find_event_membership(db, &event, request.membership_id).await?;

        let reviewer = actor.membership_id();
        let txn = db.begin().await?;
        if !edit_request::Model::review(&txn, request.id, RequestState::Approved, reviewer).await? {
            txn.rollback().await?;
            return Err(AttendanceError::AlreadyReviewed);
        }
        let outcome = AttendanceOverrideService::apply(
            &txn,
            settings,
            &event,
            &actor,
            &target,
            request.status,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(
            event_id = event.id,
            request_id = request.id,
            reviewer,
            changed = outcome.changed,
            "edit request approved"
        );

        let reviewed = Self::reload(db, request.id).await?;
        Self::notify(notifier, settings, &event, target.user_id, &reviewed, true).await;
        Ok(EditRequestReview {
            request: reviewed,
            attendance: Some(outcome.attendance),
        })
    }

    /// Rejects a pending request. The attendance log is left alone.
    pub async fn reject(
        db: &DatabaseConnection,
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        actor_user_id: i64,
        event_id: i64,
        request_id: i64,
    ) -> AttendanceResult<EditRequestReview> {
        let (event, request) = Self::find_pending(db, event_id, request_id).await?;
        let actor = AttendanceOverrideService::resolve_actor(db, actor_user_id, &event).await?;
        let target = find_event_membership(db, &event, request.membership_id).await?;

        let reviewer = actor.membership_id();
        if !edit_request::Model::review(db, request.id, RequestState::Rejected, reviewer).await? {
            return Err(AttendanceError::AlreadyReviewed);
        }
        tracing::info!(
            event_id = event.id,
            request_id = request.id,
            reviewer,
            "edit request rejected"
        );

        let reviewed = Self::reload(db, request.id).await?;
        Self::notify(notifier, settings, &event, target.user_id, &reviewed, false).await;
        Ok(EditRequestReview {
            request: reviewed,
            attendance: None,
        })
    }

    async fn find_pending(
        db: &DatabaseConnection,
        event_id: i64,
        request_id: i64,
    ) -> AttendanceResult<(event::Model, edit_request::Model)> {
        let event = find_event(db, event_id).await?;
        let request = edit_request::Entity::find_by_id(request_id)
            .one(db)
            .await?
            .filter(|r| r.event_id == event.id)
            .ok_or(AttendanceError::NotFound("Edit request"))?;
        if request.state != RequestState::Pending {
            return Err(AttendanceError::AlreadyReviewed);
        }
        Ok((event, request))
    }

    async fn reload(
        db: &DatabaseConnection,
        request_id: i64,
    ) -> AttendanceResult<edit_request::Model> {
        edit_request::Entity::find_by_id(request_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound("Edit request"))
    }

    async fn notify(
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        event: &event::Model,
        user_id: i64,
        request: &edit_request::Model,
        approved: bool,
    ) {
        let notification = Notification::edit_request_reviewed(
            event.id,
            &event.title,
            request.status,
            approved,
            &settings.deeplink_scheme,
        );
        if let Err(err) = notifier.send_to_user(user_id, &notification).await {
            tracing::warn!(
                event_id = event.id,
                user_id,
                request_id = request.id,
                error = %err,
                "edit request notification failed"
            );
        }
    }
}
