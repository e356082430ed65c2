//! Read side of the attendance log.

use crate::error::{AttendanceError, AttendanceResult};
use crate::membership_gate;
use crate::rotating_code;
use crate::settings::AttendanceSettings;
use chrono::{DateTime, Utc};
use db::models::attendance::{self, AttendanceStatus};
use db::models::{abuse_flag, event, membership};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use serde::Serialize;

/// An attendance row as callers see it.
///
/// `id` and `created_at` are `None` for the synthetic `UNCHECKED` view of a
/// member with no row yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceView {
    pub id: Option<i64>,
    pub event_id: i64,
    pub membership_id: i64,
    pub status: AttendanceStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub is_modified: bool,
    pub modifier_name: Option<String>,
}

impl AttendanceView {
    /// View of a scan row, which never has a modifier.
    pub fn from_scan(row: attendance::Model) -> Self {
        Self {
            id: Some(row.id),
            event_id: row.event_id,
            membership_id: row.membership_id,
            status: row.status,
            created_at: Some(row.created_at),
            is_modified: row.is_modified,
            modifier_name: None,
        }
    }

    /// View of any row, with the modifier's username looked up.
    pub async fn from_row<C>(db: &C, row: attendance::Model) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let modifier_name = match row.modifier_membership_id {
            Some(id) => membership::Model::username(db, id).await?,
            None => None,
        };
        Ok(Self {
            modifier_name,
            ..Self::from_scan(row)
        })
    }

    pub fn unchecked(event_id: i64, membership_id: i64) -> Self {
        Self {
            id: None,
            event_id,
            membership_id,
            status: AttendanceStatus::Unchecked,
            created_at: None,
            is_modified: false,
            modifier_name: None,
        }
    }
}

/// Latest override and latest scan of one member, side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberLog {
    pub membership_id: i64,
    pub username: Option<String>,
    pub modified: Option<AttendanceView>,
    pub unmodified: Option<AttendanceView>,
}

/// What an officer's screen displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentCode {
    pub code: String,
    pub generated_at: i64,
    pub valid_for_seconds: i64,
}

pub(crate) async fn find_event<C>(db: &C, event_id: i64) -> AttendanceResult<event::Model>
where
    C: ConnectionTrait,
{
    event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(AttendanceError::NotFound("Event"))
}

/// A membership that belongs to the event's generation, or `NotFound`.
pub(crate) async fn find_event_membership<C>(
    db: &C,
    event: &event::Model,
    membership_id: i64,
) -> AttendanceResult<membership::Model>
where
    C: ConnectionTrait,
{
    membership::Entity::find_by_id(membership_id)
        .one(db)
        .await?
        .filter(|m| m.generation_id == event.generation_id)
        .ok_or(AttendanceError::NotFound("Membership"))
}

pub struct AttendanceQueryService;

impl AttendanceQueryService {
    pub async fn my_attendance<C>(
        db: &C,
        user_id: i64,
        event_id: i64,
    ) -> AttendanceResult<AttendanceView>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        let member = membership_gate::require_member(db, user_id, event.generation_id).await?;

        match attendance::Model::latest_for(db, event.id, member.membership_id()).await? {
            Some(row) => Ok(AttendanceView::from_row(db, row).await?),
            None => Ok(AttendanceView::unchecked(event.id, member.membership_id())),
        }
    }

    pub async fn member_log<C>(
        db: &C,
        event_id: i64,
        membership_id: i64,
    ) -> AttendanceResult<MemberLog>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        let target = find_event_membership(db, &event, membership_id).await?;

        let latest_modified =
            attendance::Model::latest_with_flag(db, event.id, target.id, true).await?;
        let modified = match latest_modified {
            Some(row) => Some(AttendanceView::from_row(db, row).await?),
            None => None,
        };
        let unmodified = attendance::Model::latest_with_flag(db, event.id, target.id, false)
            .await?
            .map(AttendanceView::from_scan);

        Ok(MemberLog {
            membership_id: target.id,
            username: membership::Model::username(db, target.id).await?,
            modified,
            unmodified,
        })
    }

    pub async fn list_abuse_flags<C>(
        db: &C,
        event_id: i64,
    ) -> AttendanceResult<Vec<abuse_flag::Model>>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        Ok(abuse_flag::Model::find_for_event(db, event.id).await?)
    }

    pub async fn current_code<C>(
        db: &C,
        settings: &AttendanceSettings,
        event_id: i64,
        now: DateTime<Utc>,
    ) -> AttendanceResult<CurrentCode>
    where
        C: ConnectionTrait,
    {
        let event = find_event(db, event_id).await?;
        let generated_at = now.timestamp();
        Ok(CurrentCode {
            code: rotating_code::generate_code(&event.secret, generated_at),
            generated_at,
            valid_for_seconds: settings.code_tolerance_seconds,
        })
    }
}
