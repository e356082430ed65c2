use chrono::{FixedOffset, Offset, Utc};
use util::config;

/// Tunables the attendance protocols read, projected from [`config`].
#[derive(Debug, Clone)]
pub struct AttendanceSettings {
    pub code_tolerance_seconds: i64,
    /// Zone that event dates and start times are written in.
    pub event_offset: FixedOffset,
    pub max_conflict_retries: u32,
    pub finalize_lookback_days: i64,
    pub deeplink_scheme: String,
}

impl AttendanceSettings {
    pub fn from_config() -> Self {
        let minutes = config::event_utc_offset_minutes();
        let event_offset = FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!(minutes, "EVENT_UTC_OFFSET_MINUTES out of range, using UTC");
            Utc.fix()
        });

        Self {
            code_tolerance_seconds: config::code_tolerance_seconds(),
            event_offset,
            max_conflict_retries: config::max_conflict_retries(),
            finalize_lookback_days: config::finalize_lookback_days(),
            deeplink_scheme: config::deeplink_scheme(),
        }
    }
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            code_tolerance_seconds: 10,
            event_offset: Utc.fix(),
            max_conflict_retries: 3,
            finalize_lookback_days: 1,
            deeplink_scheme: "wasso".into(),
        }
    }
}
