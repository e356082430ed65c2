//! Absence applications: a member tells the officers ahead of time that they
//! will be absent or late. Reviewing one records the decision only; the
//! attendance log still follows scans, overrides and finalization.

use crate::attendance_query::{find_event, find_event_membership};
use crate::attendance_override::AttendanceOverrideService;
use crate::edit_request::validate;
use crate::error::{AttendanceError, AttendanceResult};
use crate::membership_gate;
use crate::notification::{Notification, NotificationSender};
use crate::settings::AttendanceSettings;
use db::models::absence_application;
use db::models::attendance::AttendanceStatus;
use db::models::edit_request::RequestState;
use db::models::role::Capability;
use db::models::{event, membership};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};
use serde::Deserialize;

/// Body of a new absence application.
#[derive(Debug, Clone, Deserialize)]
pub struct AbsenceApplicationBody {
    pub reason: String,
    #[serde(default = "applied_default")]
    pub status: AttendanceStatus,
}

fn applied_default() -> AttendanceStatus {
    AttendanceStatus::Absent
}

pub struct AbsenceService;

impl AbsenceService {
    /// Files the application and tells every member who manages attendance.
    pub async fn submit(
        db: &DatabaseConnection,
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        user_id: i64,
        event_id: i64,
        body: &AbsenceApplicationBody,
    ) -> AttendanceResult<absence_application::Model> {
        let event = find_event(db, event_id).await?;
        let reason = validate(&body.reason, body.status)?;
        let member = membership_gate::require_member(db, user_id, event.generation_id).await?;

        let application = absence_application::Model::create(
            db,
            event.id,
            member.membership_id(),
            reason,
            body.status,
        )
        .await?;
        tracing::info!(
            event_id = event.id,
            membership_id = member.membership_id(),
            application_id = application.id,
            status = %body.status,
            "absence application submitted"
        );

        let managers = membership::Model::current_with_capability(
            db,
            event.generation_id,
            Capability::ManageAttendance,
        )
        .await?;
        let recipients: Vec<i64> = managers.iter().map(|m| m.user_id).collect();
        if !recipients.is_empty() {
            let username = membership::Model::username(db, member.membership_id())
                .await?
                .unwrap_or_default();
            let notification = Notification::absence_applied(
                event.id,
                &event.title,
                &username,
                body.status,
                &settings.deeplink_scheme,
            );
            if let Err(err) = notifier.send_to_users(&recipients, &notification).await {
                tracing::warn!(
                    event_id = event.id,
                    recipients = recipients.len(),
                    error = %err,
                    "absence application notification failed"
                );
            }
        }
        Ok(application)
    }

    /// The caller's most recent application for the event.
    pub async fn latest_mine<C>(
        db: &C,
        user_id: i64,
        event_id: i64,
    ) -> AttendanceResult<absence_application::Model>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        let member = membership_gate::require_member(db, user_id, event.generation_id).await?;
        absence_application::Model::latest_for(db, event.id, member.membership_id())
            .await?
            .ok_or(AttendanceError::NotFound("Absence application"))
    }

    pub async fn list_for_event<C>(
        db: &C,
        event_id: i64,
    ) -> AttendanceResult<Vec<absence_application::Model>>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        Ok(absence_application::Model::for_event(db, event.id).await?)
    }

    /// Approves or rejects a pending application and notifies the applicant.
    pub async fn review(
        db: &DatabaseConnection,
        notifier: &dyn NotificationSender,
        settings: &AttendanceSettings,
        actor_user_id: i64,
        event_id: i64,
        application_id: i64,
        approve: bool,
    ) -> AttendanceResult<absence_application::Model> {
        let event = find_event(db, event_id).await?;
        let application = find_application(db, &event, application_id).await?;
        if application.state != RequestState::Pending {
            return Err(AttendanceError::AlreadyReviewed);
        }
        let actor = AttendanceOverrideService::resolve_actor(db, actor_user_id, &event).await?;
        let applicant = find_event_membership(db, &event, application.membership_id).await?;

        let state = if approve {
            RequestState::Approved
        } else {
            RequestState::Rejected
        };
        let reviewer = actor.membership_id();
        if !absence_application::Model::review(db, application.id, state, reviewer).await? {
            return Err(AttendanceError::AlreadyReviewed);
        }
        tracing::info!(
            event_id = event.id,
            application_id = application.id,
            reviewer,
            %state,
            "absence application reviewed"
        );

        let notification = Notification::absence_reviewed(
            event.id,
            &event.title,
            application.status,
            approve,
            &settings.deeplink_scheme,
        );
        if let Err(err) = notifier.send_to_user(applicant.user_id, &notification).await {
            tracing::warn!(
                event_id = event.id,
                user_id = applicant.user_id,
                error = %err,
                "absence review notification failed"
            );
        }

        find_application(db, &event, application.id).await
    }
}

async fn find_application<C>(
    db: &C,
    event: &event::Model,
    application_id: i64,
) -> AttendanceResult<absence_application::Model>
where
    C: ConnectionTrait,
{
    absence_application::Entity::find_by_id(application_id)
        .one(db)
        .await?
        .filter(|a| a.event_id == event.id)
        .ok_or(AttendanceError::NotFound("Absence application"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RecordingNotificationSender;
    use db::models::attendance;
    use db::test_utils::{add_member, seed_club, seed_event, setup_test_db};

    fn body(reason: &str) -> AbsenceApplicationBody {
        AbsenceApplicationBody {
            reason: reason.into(),
            status: AttendanceStatus::Absent,
        }
    }

    #[tokio::test]
    async fn submitting_notifies_the_attendance_managers() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let owner = add_member(&db, &club, "owner", club.owner_role.id).await;
        let officer = add_member(&db, &club, "officer", club.admin_role.id).await;
        let member = add_member(&db, &club, "jin", club.member_role.id).await;
        add_member(&db, &club, "bystander", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let notifier = RecordingNotificationSender::new();

        let application = AbsenceService::submit(
            &db,
            &notifier,
            &AttendanceSettings::default(),
            member.user_id,
            event.id,
            &body("family trip"),
        )
        .await
        .unwrap();
        assert_eq!(application.state, RequestState::Pending);
        assert_eq!(application.status, AttendanceStatus::Absent);

        let calls = notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![owner.user_id, officer.user_id]);
        assert_eq!(calls[0].1.body, "[Weekly meeting] jin applied for ABSENT.");

        let mine = AbsenceService::latest_mine(&db, member.user_id, event.id).await.unwrap();
        assert_eq!(mine.id, application.id);
        assert_eq!(AbsenceService::list_for_event(&db, event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approval_notifies_the_applicant_and_leaves_the_log_alone() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let officer = add_member(&db, &club, "officer", club.admin_role.id).await;
        let member = add_member(&db, &club, "jin", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let notifier = RecordingNotificationSender::new();
        let settings = AttendanceSettings::default();

        let application = AbsenceService::submit(
            &db,
            &RecordingNotificationSender::new(),
            &settings,
            member.user_id,
            event.id,
            &body("exam"),
        )
        .await
        .unwrap();

        let reviewed = AbsenceService::review(
            &db,
            &notifier,
            &settings,
            officer.user_id,
            event.id,
            application.id,
            true,
        )
        .await
        .unwrap();
        assert_eq!(reviewed.state, RequestState::Approved);
        assert_eq!(reviewed.reviewer_membership_id, Some(officer.id));
        assert_eq!(
            attendance::Model::count_for_pair(&db, event.id, member.id).await.unwrap(),
            0
        );

        let calls = notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![member.user_id]);
        assert_eq!(calls[0].1.title, "ABSENT application approved");

        let err = AbsenceService::review(
            &db,
            &notifier,
            &settings,
            officer.user_id,
            event.id,
            application.id,
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyReviewed));
        assert_eq!(notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn an_empty_reason_is_refused() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "jin", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let notifier = RecordingNotificationSender::new();

        let err = AbsenceService::submit(
            &db,
            &notifier,
            &AttendanceSettings::default(),
            member.user_id,
            event.id,
            &body(""),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidRequest(_)));
        assert!(notifier.calls().is_empty());

        let err = AbsenceService::latest_mine(&db, member.user_id, event.id).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound("Absence application")));
    }
}
