//! Marks unresolved members `ABSENT` once an event's fail threshold passes.
//!
//! Safe to run repeatedly and alongside live check-ins: members whose latest
//! row is already resolved are skipped, and the append goes through the same
//! sequence guard as the scan path.

use crate::attendance_log::{AppendOutcome, append_with_retry};
use crate::attendance_query::find_event;
use crate::classifier::EventSchedule;
use crate::error::{AttendanceError, AttendanceResult};
use crate::settings::AttendanceSettings;
use chrono::{DateTime, Duration, Utc};
use db::is_unique_violation;
use db::models::attendance::{AttendanceStatus, NewAttendance};
use db::models::{event, membership};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizeFailure {
    pub event_id: i64,
    pub code: &'static str,
    pub message: String,
}

/// Outcome of one sweep over the due events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Due events the sweep attempted, failed ones included.
    pub processed: usize,
    /// `ABSENT` rows written across all events.
    pub created: usize,
    pub failures: Vec<FinalizeFailure>,
}

pub struct FinalizeService;

impl FinalizeService {
    /// Finalizes one event and returns how many rows were written.
    pub async fn finalize_event(
        db: &DatabaseConnection,
        settings: &AttendanceSettings,
        event_id: i64,
        now: DateTime<Utc>,
    ) -> AttendanceResult<usize> {
        let event = find_event(db, event_id).await?;
        if !EventSchedule::for_event(&event, settings.event_offset).is_due(now) {
            return Err(AttendanceError::NotDue);
        }
        Self::finalize_loaded(db, settings, &event).await
    }

    /// Finalizes every due event dated within the lookback window. A failing
    /// event is recorded in the report and does not stop the others.
    pub async fn finalize_due_events(
        db: &DatabaseConnection,
        settings: &AttendanceSettings,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, DbErr> {
        let today = now.with_timezone(&settings.event_offset).date_naive();
        let from = today - Duration::days(settings.finalize_lookback_days.max(0));
        let candidates = event::Model::find_dated_between(db, from, today).await?;

        let mut report = SweepReport::default();
        for event in candidates
            .iter()
            .filter(|e| EventSchedule::for_event(e, settings.event_offset).is_due(now))
        {
            report.processed += 1;
            match Self::finalize_loaded(db, settings, event).await {
                Ok(created) => report.created += created,
                Err(err) => {
                    let failure = FinalizeFailure {
                        event_id: event.id,
                        code: failure_code(&err),
                        message: err.to_string(),
                    };
                    tracing::error!(
                        event_id = event.id,
                        code = failure.code,
                        error = %err,
                        "finalize failed"
                    );
                    report.failures.push(failure);
                }
            }
        }

        if report.created > 0 || !report.failures.is_empty() {
            tracing::info!(
                processed = report.processed,
                created = report.created,
                failures = report.failures.len(),
                "finalize sweep finished"
            );
        }
        Ok(report)
    }

    async fn finalize_loaded(
        db: &DatabaseConnection,
        settings: &AttendanceSettings,
        event: &event::Model,
    ) -> AttendanceResult<usize> {
        let members = membership::Model::current_for_generation(db, event.generation_id).await?;

        let mut created = 0;
        for member in &members {
            let outcome = append_with_retry(
                db,
                event.id,
                member.id,
                settings.max_conflict_retries,
                |latest| {
                    if latest.is_some_and(|row| row.is_resolved()) {
                        return None;
                    }
                    Some(NewAttendance {
                        event_id: event.id,
                        membership_id: member.id,
                        status: AttendanceStatus::Absent,
                        is_modified: true,
                        ..Default::default()
                    })
                },
            )
            .await?;

            if matches!(outcome, AppendOutcome::Appended(_)) {
                created += 1;
            }
        }

        if created > 0 {
            tracing::info!(event_id = event.id, created, "event finalized");
        }
        Ok(created)
    }
}

fn failure_code(err: &AttendanceError) -> &'static str {
    match err {
        AttendanceError::Database(db_err) if is_unique_violation(db_err) => "CONFLICT",
        other => other.code(),
    }
}
