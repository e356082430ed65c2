//! Officer-driven status changes. Every change appends an `is_modified` row
//! naming the officer; nothing is rewritten in place.

use crate::attendance_log::{AppendOutcome, append_with_retry};
use crate::attendance_query::{AttendanceView, find_event, find_event_membership};
use crate::error::{AttendanceError, AttendanceResult};
use crate::membership_gate::{self, MemberContext};
use crate::notification::{Notification, NotificationSender};
use crate::settings::AttendanceSettings;
use db::models::attendance::{AttendanceStatus, NewAttendance};
use db::models::{event, membership};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct OverrideOutcome {
    pub attendance: AttendanceView,
    /// False when the member already had the requested status.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendAllFailure {
    pub membership_id: i64,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AttendAllReport {
    pub changed: Vec<AttendanceView>,
    pub unchanged: usize,
    /// Members whose append failed. The rest of the batch still ran.
    pub failures: Vec<AttendAllFailure>,
}

pub struct AttendanceOverrideService;

impl AttendanceOverrideService {
    /// Sets `membership_id`'s status for the event on behalf of `actor_user_id`.
    ///
    /// Whether the actor may do this at all is checked by the caller; here
    /// the actor only has to be a current member of the event's generation.
    pub async fn change_status(
        db: &DatabaseConnection,
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        actor_user_id: i64,
        event_id: i64,
        membership_id: i64,
        status: AttendanceStatus,
    ) -> AttendanceResult<OverrideOutcome> {
        let event = find_event(db, event_id).await?;
        let actor = Self::resolve_actor(db, actor_user_id, &event).await?;
        let target = find_event_membership(db, &event, membership_id).await?;

        let outcome = Self::apply(db, settings, &event, &actor, &target, status).await?;
        if outcome.changed {
            let notification = Notification::attendance_change(
                event.id,
                &event.title,
                status,
                &settings.deeplink_scheme,
            );
            if let Err(err) = notifier.send_to_user(target.user_id, &notification).await {
                tracing::warn!(
                    event_id = event.id,
                    user_id = target.user_id,
                    error = %err,
                    "attendance change notification failed"
                );
            }
        }
        Ok(outcome)
    }

    /// Marks every current member of the event's generation `PRESENT`.
    /// Members already present are left alone; the rest are notified with
    /// one batched send. A member whose append fails is reported and skipped.
    pub async fn attend_all(
        db: &DatabaseConnection,
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        actor_user_id: i64,
        event_id: i64,
    ) -> AttendanceResult<AttendAllReport> {
        let event = find_event(db, event_id).await?;
        let actor = Self::resolve_actor(db, actor_user_id, &event).await?;
        let members = membership::Model::current_for_generation(db, event.generation_id).await?;

        let mut report = AttendAllReport::default();
        let mut notify = Vec::new();
        for target in &members {
            let applied =
                Self::apply(db, settings, &event, &actor, target, AttendanceStatus::Present).await;
            match applied {
                Ok(outcome) if outcome.changed => {
                    notify.push(target.user_id);
                    report.changed.push(outcome.attendance);
                }
                Ok(_) => report.unchanged += 1,
                Err(err) => {
                    tracing::error!(
                        event_id = event.id,
                        membership_id = target.id,
                        code = err.code(),
                        error = %err,
                        "attend-all failed for member"
                    );
                    report.failures.push(AttendAllFailure {
                        membership_id: target.id,
                        code: err.code(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            event_id = event.id,
            actor = actor.membership_id(),
            changed = report.changed.len(),
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "attend-all applied"
        );

        if !notify.is_empty() {
            let notification = Notification::attendance_change(
                event.id,
                &event.title,
                AttendanceStatus::Present,
                &settings.deeplink_scheme,
            );
            if let Err(err) = notifier.send_to_users(&notify, &notification).await {
                tracing::warn!(
                    event_id = event.id,
                    recipients = notify.len(),
                    error = %err,
                    "attend-all notification failed"
                );
            }
        }
        Ok(report)
    }

    pub(crate) async fn resolve_actor<C>(
        db: &C,
        actor_user_id: i64,
        event: &event::Model,
    ) -> AttendanceResult<MemberContext>
    where
        C: ConnectionTrait,
    {
        membership_gate::resolve(db, actor_user_id, event.generation_id)
            .await?
            .ok_or(AttendanceError::Forbidden)
    }

    /// Appends the override row without notifying anyone. Runs inside `db`'s
    /// transaction when `db` is one.
    pub(crate) async fn apply<C>(
        db: &C,
        settings: &AttendanceSettings,
        event: &event::Model,
        actor: &MemberContext,
        target: &membership::Model,
        status: AttendanceStatus,
    ) -> AttendanceResult<OverrideOutcome>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let outcome = append_with_retry(
            db,
            event.id,
            target.id,
            settings.max_conflict_retries,
            |latest| {
                if latest.is_some_and(|row| row.status == status) {
                    return None;
                }
                Some(NewAttendance {
                    event_id: event.id,
                    membership_id: target.id,
                    status,
                    is_modified: true,
                    modifier_membership_id: Some(actor.membership_id()),
                    ..Default::default()
                })
            },
        )
        .await?;

        match outcome {
            AppendOutcome::Appended(row) => {
                tracing::info!(
                    event_id = event.id,
                    membership_id = target.id,
                    modifier = actor.membership_id(),
                    %status,
                    "attendance overridden"
                );
                Ok(OverrideOutcome {
                    attendance: AttendanceView::from_row(db, row).await?,
                    changed: true,
                })
            }
            AppendOutcome::Unchanged(Some(row)) => Ok(OverrideOutcome {
                attendance: AttendanceView::from_row(db, row).await?,
                changed: false,
            }),
            AppendOutcome::Unchanged(None) => Err(AttendanceError::NotFound("Attendance")),
        }
    }
}
