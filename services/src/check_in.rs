//! The scan path: a member presents the code shown at the event.

use crate::abuse_detector;
use crate::attendance_log::busy_backoff;
use crate::attendance_query::AttendanceView;
use crate::classifier::EventSchedule;
use crate::error::{AttendanceError, AttendanceResult};
use crate::membership_gate;
use crate::rotating_code;
use crate::settings::AttendanceSettings;
use chrono::{DateTime, Utc};
use db::{is_busy, is_unique_violation};
use db::models::attendance::{self, NewAttendance};
use db::models::{device_token, event};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInRequest {
    pub code: String,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_model: Option<String>,
}

pub struct CheckInService;

impl CheckInService {
    /// Records a scan for `user_id` at `event_id`.
    ///
    /// Membership resolution, the duplicate check and the insert run in one
    /// transaction. A concurrent scan for the same member makes the insert
    /// collide on the attendance sequence (or, on SQLite, on the write
    /// lock); the loser re-reads and ends up with `AlreadyCheckedIn`. The
    /// shared-device check runs after commit and cannot fail the call.
    pub async fn check_in(
        db: &DatabaseConnection,
        settings: &AttendanceSettings,
        user_id: i64,
        event_id: i64,
        request: &CheckInRequest,
        now: DateTime<Utc>,
    ) -> AttendanceResult<AttendanceView> {
        let event = event::Entity::find_by_id(event_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound("Event"))?;

        if !rotating_code::verify(
            &request.code,
            &event.secret,
            now.timestamp(),
            settings.code_tolerance_seconds,
        ) {
            tracing::info!(event_id, user_id, "check-in rejected: invalid code");
            return Err(AttendanceError::InvalidCode);
        }

        let attempts = settings.max_conflict_retries.max(1);
        let mut attempt = 0;
        let row = loop {
            attempt += 1;
            let txn = db.begin().await?;
            match Self::record_scan(&txn, settings, user_id, &event, request, now).await {
                Ok(row) => {
                    txn.commit().await?;
                    break row;
                }
                Err(AttendanceError::Database(err))
                    if is_unique_violation(&err) || is_busy(&err) =>
                {
                    txn.rollback().await?;
                    tracing::debug!(event_id, user_id, attempt, "check-in lost an append race");
                    if attempt >= attempts {
                        return Err(if is_unique_violation(&err) {
                            AttendanceError::AlreadyCheckedIn
                        } else {
                            AttendanceError::Database(err)
                        });
                    }
                    if is_busy(&err) {
                        busy_backoff(attempt).await;
                    }
                }
                Err(err) => {
                    txn.rollback().await?;
                    return Err(err);
                }
            }
        };

        tracing::info!(
            event_id,
            user_id,
            membership_id = row.membership_id,
            status = %row.status,
            "checked in"
        );

        if let Err(err) = abuse_detector::flag_shared_device(db, &row).await {
            tracing::warn!(
                event_id,
                attendance_id = row.id,
                error = %err,
                "abuse evaluation failed"
            );
        }

        Ok(AttendanceView::from_scan(row))
    }

    async fn record_scan<C>(
        db: &C,
        settings: &AttendanceSettings,
        user_id: i64,
        event: &event::Model,
        request: &CheckInRequest,
        now: DateTime<Utc>,
    ) -> AttendanceResult<attendance::Model>
    where
        C: ConnectionTrait,
    {
        let member = membership_gate::require_member(db, user_id, event.generation_id).await?;

        let latest = attendance::Model::latest_for(db, event.id, member.membership_id()).await?;
        if latest.as_ref().is_some_and(attendance::Model::is_resolved) {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        let device_token_id = match request
            .device_id
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            Some(device_id) => Some(
                device_token::Model::find_or_create(
                    db,
                    user_id,
                    device_id,
                    request.device_model.as_deref(),
                )
                .await?
                .id,
            ),
            None => None,
        };

        let status = EventSchedule::for_event(event, settings.event_offset).classify(now)?;

        let row = attendance::Model::append(
            db,
            NewAttendance {
                event_id: event.id,
                membership_id: member.membership_id(),
                status,
                is_modified: false,
                modifier_membership_id: None,
                latitude: request.latitude,
                longitude: request.longitude,
                device_token_id,
            },
            latest.as_ref(),
        )
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotating_code::generate_code;
    use chrono::TimeZone;
    use db::models::attendance::AttendanceStatus;
    use db::models::{abuse_flag, join_request, user};
    use db::test_utils::{add_member, seed_club, seed_event, setup_file_test_db, setup_test_db};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
    }

    fn request(event: &event::Model, now: DateTime<Utc>) -> CheckInRequest {
        CheckInRequest {
            code: generate_code(&event.secret, now.timestamp()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn scan_inside_the_window_records_present() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "nia", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let settings = AttendanceSettings::default();
        let now = at(9, 55);

        let mut req = request(&event, now);
        req.latitude = Some(37.56);
        req.longitude = Some(126.97);

        let view = CheckInService::check_in(&db, &settings, member.user_id, event.id, &req, now)
            .await
            .unwrap();
        assert_eq!(view.status, AttendanceStatus::Present);
        assert!(!view.is_modified);
        assert!(view.modifier_name.is_none());

        let stored = attendance::Model::latest_for(&db, event.id, member.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.latitude, Some(37.56));
        assert_eq!(stored.seq, 0);
    }

    #[tokio::test]
    async fn late_scan_is_late() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "oli", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let now = at(10, 15);

        let view = CheckInService::check_in(
            &db,
            &AttendanceSettings::default(),
            member.user_id,
            event.id,
            &request(&event, now),
            now,
        )
        .await
        .unwrap();
        assert_eq!(view.status, AttendanceStatus::Late);
    }

    #[tokio::test]
    async fn stale_or_wrong_codes_are_rejected() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "pat", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let settings = AttendanceSettings::default();
        let now = at(9, 55);

        let stale = CheckInRequest {
            code: generate_code(&event.secret, now.timestamp() - settings.code_tolerance_seconds),
            ..Default::default()
        };
        let wrong = CheckInRequest {
            code: "not-a-code".into(),
            ..Default::default()
        };

        for req in [stale, wrong] {
            let err = CheckInService::check_in(&db, &settings, member.user_id, event.id, &req, now)
                .await
                .unwrap_err();
            assert!(matches!(err, AttendanceError::InvalidCode));
        }
        assert_eq!(
            attendance::Model::count_for_pair(&db, event.id, member.id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn second_scan_is_a_duplicate_and_writes_nothing() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "quin", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let settings = AttendanceSettings::default();

        let first = at(9, 55);
        CheckInService::check_in(
            &db,
            &settings,
            member.user_id,
            event.id,
            &request(&event, first),
            first,
        )
        .await
        .unwrap();

        let again = at(10, 5);
        let err = CheckInService::check_in(
            &db,
            &settings,
            member.user_id,
            event.id,
            &request(&event, again),
            again,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AttendanceError::AlreadyCheckedIn));
        assert_eq!(
            attendance::Model::count_for_pair(&db, event.id, member.id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn unchecked_row_does_not_block_a_scan() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "rae", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let placeholder = attendance::Model::append(
            &db,
            NewAttendance {
                event_id: event.id,
                membership_id: member.id,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let now = at(9, 58);
        CheckInService::check_in(
            &db,
            &AttendanceSettings::default(),
            member.user_id,
            event.id,
            &request(&event, now),
            now,
        )
        .await
        .unwrap();

        let latest = attendance::Model::latest_for(&db, event.id, member.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.seq, placeholder.seq + 1);
        assert_eq!(latest.status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn scan_before_open_is_not_open_yet() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "sam", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let now = at(9, 40);

        let err = CheckInService::check_in(
            &db,
            &AttendanceSettings::default(),
            member.user_id,
            event.id,
            &request(&event, now),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::NotOpenYet));
    }

    #[tokio::test]
    async fn non_members_get_the_matching_rejection() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let event = seed_event(&db, club.generation.id).await;
        let outsider = user::Model::create(&db, "outsider").await.unwrap();
        let applicant = user::Model::create(&db, "applicant").await.unwrap();
        join_request::Model::create(&db, applicant.id, club.generation.id)
            .await
            .unwrap();
        let settings = AttendanceSettings::default();
        let now = at(9, 55);

        let err = CheckInService::check_in(
            &db,
            &settings,
            outsider.id,
            event.id,
            &request(&event, now),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::NotRegisteredClub));

        let err = CheckInService::check_in(
            &db,
            &settings,
            applicant.id,
            event.id,
            &request(&event, now),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::WaitingForApproval));
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let db = setup_test_db().await;
        let err = CheckInService::check_in(
            &db,
            &AttendanceSettings::default(),
            1,
            404,
            &CheckInRequest::default(),
            at(10, 0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound("Event")));
    }

    #[tokio::test]
    async fn shared_device_flags_but_does_not_block() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let tae = add_member(&db, &club, "tae", club.member_role.id).await;
        let uma = add_member(&db, &club, "uma", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let settings = AttendanceSettings::default();
        let now = at(9, 55);

        let with_device = |now| CheckInRequest {
            device_id: Some("phone-1".into()),
            device_model: Some("Galaxy".into()),
            ..request(&event, now)
        };

        let first =
            CheckInService::check_in(&db, &settings, tae.user_id, event.id, &with_device(now), now)
                .await
                .unwrap();
        let second =
            CheckInService::check_in(&db, &settings, uma.user_id, event.id, &with_device(now), now)
                .await
                .unwrap();
        assert_eq!(second.status, AttendanceStatus::Present);

        let flags = abuse_flag::Model::find_for_event(&db, event.id).await.unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].attendance_id, first.id.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scans_for_one_member_record_once() {
        let db = setup_file_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "rio", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;
        let settings = AttendanceSettings {
            max_conflict_retries: 20,
            ..Default::default()
        };
        let now = at(9, 55);
        let scan = request(&event, now);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let (db, settings, scan) = (db.clone(), settings.clone(), scan.clone());
                let (user_id, event_id) = (member.user_id, event.id);
                tokio::spawn(async move {
                    CheckInService::check_in(&db, &settings, user_id, event_id, &scan, now).await
                })
            })
            .collect();

        let mut recorded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(view) => {
                    recorded += 1;
                    assert_eq!(view.status, AttendanceStatus::Present);
                }
                Err(err) => assert!(
                    matches!(err, AttendanceError::AlreadyCheckedIn),
                    "unexpected error: {err:?}"
                ),
            }
        }

        assert_eq!(recorded, 1);
        assert_eq!(
            attendance::Model::count_for_pair(&db, event.id, member.id).await.unwrap(),
            1
        );
    }
}
