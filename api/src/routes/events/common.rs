use db::models::attendance::AttendanceStatus;
use serde::Deserialize;

/// Body of `PUT /events/{event_id}/attendance`.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusReq {
    #[serde(alias = "memberId")]
    pub member_id: i64,
    #[serde(alias = "newStatus", alias = "new_status")]
    pub status: AttendanceStatus,
}
