//! Attendance core: rotating codes, window classification, membership
//! gating, the check-in and override protocols, finalization, member-filed
//! edit requests and absence applications, and the notification seam.

pub mod absence;
pub mod abuse_detector;
mod attendance_log;
pub mod attendance_override;
pub mod attendance_query;
pub mod check_in;
pub mod classifier;
pub mod edit_request;
pub mod error;
pub mod finalize;
pub mod membership_gate;
pub mod notification;
pub mod rotating_code;
pub mod settings;

pub use error::{AttendanceError, AttendanceResult, ErrorKind};
pub use settings::AttendanceSettings;
