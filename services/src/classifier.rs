use crate::error::{AttendanceError, AttendanceResult};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use db::models::attendance::AttendanceStatus;
use db::models::event;

/// Absolute instants of an event's three thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSchedule {
    pub open: DateTime<Utc>,
    pub late_at: DateTime<Utc>,
    pub fail_at: DateTime<Utc>,
}

impl EventSchedule {
    /// Anchors the event's wall-clock start in `offset` and applies its
    /// window offsets.
    pub fn for_event(event: &event::Model, offset: FixedOffset) -> Self {
        let start = offset
            .from_local_datetime(&event.starts_at_local())
            .single()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&event.starts_at_local()));
        let at = |minutes: i32| start + Duration::minutes(i64::from(minutes));

        Self {
            open: at(event.start_offset_minutes),
            late_at: at(event.late_offset_minutes),
            fail_at: at(event.fail_offset_minutes),
        }
    }

    /// Status a scan at `now` earns.
    pub fn classify(&self, now: DateTime<Utc>) -> AttendanceResult<AttendanceStatus> {
        if now < self.open {
            Err(AttendanceError::NotOpenYet)
        } else if now < self.late_at {
            Ok(AttendanceStatus::Present)
        } else if now < self.fail_at {
            Ok(AttendanceStatus::Late)
        } else {
            Ok(AttendanceStatus::Absent)
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.fail_at
    }
}

pub fn classify(
    event: &event::Model,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> AttendanceResult<AttendanceStatus> {
    EventSchedule::for_event(event, offset).classify(now)
}
