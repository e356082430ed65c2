use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One entry of the append-only attendance log.
///
/// Rows are never updated. The current state of an (event, membership) pair
/// is the row with the highest `seq`; `(event_id, membership_id, seq)` is
/// unique so two writers appending after the same row cannot both succeed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: i64,
    pub membership_id: i64,
    pub seq: i32,
    pub status: AttendanceStatus,
    pub is_modified: bool,
    pub modifier_membership_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_token_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[default]
    #[sea_orm(string_value = "unchecked")]
    Unchecked,
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "absent")]
    Absent,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::membership::Entity",
        from = "Column::MembershipId",
        to = "super::membership::Column::Id"
    )]
    Membership,
    #[sea_orm(
        belongs_to = "super::membership::Entity",
        from = "Column::ModifierMembershipId",
        to = "super::membership::Column::Id"
    )]
    Modifier,
    #[sea_orm(
        belongs_to = "super::device_token::Entity",
        from = "Column::DeviceTokenId",
        to = "super::device_token::Column::Id"
    )]
    DeviceToken,
    #[sea_orm(has_many = "super::abuse_flag::Entity")]
    AbuseFlags,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membership.def()
    }
}

impl Related<super::device_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceToken.def()
    }
}

impl Related<super::abuse_flag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AbuseFlags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Field values of a row about to be appended.
#[derive(Debug, Clone, Default)]
pub struct NewAttendance {
    pub event_id: i64,
    pub membership_id: i64,
    pub status: AttendanceStatus,
    pub is_modified: bool,
    pub modifier_membership_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_token_id: Option<i64>,
}

impl Model {
    /// Appends a row directly after `after` (the caller's view of the
    /// latest row, or `None` for the first one).
    ///
    /// If another writer appended in the meantime this fails with a unique
    /// constraint violation; callers re-read and retry.
    pub async fn append<C>(
        db: &C,
        new: NewAttendance,
        after: Option<&Model>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let seq = after.map_or(0, |prev| prev.seq + 1);

        ActiveModel {
            event_id: Set(new.event_id),
            membership_id: Set(new.membership_id),
            seq: Set(seq),
            status: Set(new.status),
            is_modified: Set(new.is_modified),
            modifier_membership_id: Set(new.modifier_membership_id),
            latitude: Set(new.latitude),
            longitude: Set(new.longitude),
            device_token_id: Set(new.device_token_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The current row for the pair.
    pub async fn latest_for<C>(
        db: &C,
        event_id: i64,
        membership_id: i64,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::MembershipId.eq(membership_id))
            .order_by_desc(Column::Seq)
            .one(db)
            .await
    }

    /// The latest override row (`is_modified = true`) or scan row (`false`).
    pub async fn latest_with_flag<C>(
        db: &C,
        event_id: i64,
        membership_id: i64,
        is_modified: bool,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::MembershipId.eq(membership_id))
            .filter(Column::IsModified.eq(is_modified))
            .order_by_desc(Column::Seq)
            .one(db)
            .await
    }

    /// The earliest row in the event bound to `device_token_id` that belongs
    /// to a different membership.
    pub async fn earliest_other_on_device<C>(
        db: &C,
        event_id: i64,
        device_token_id: i64,
        membership_id: i64,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::DeviceTokenId.eq(device_token_id))
            .filter(Column::MembershipId.ne(membership_id))
            .order_by_asc(Column::Id)
            .one(db)
            .await
    }

    pub async fn count_for_pair<C>(db: &C, event_id: i64, membership_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::MembershipId.eq(membership_id))
            .count(db)
            .await
    }

    /// A row is resolved once it carries anything other than `UNCHECKED`.
    pub fn is_resolved(&self) -> bool {
        self.status != AttendanceStatus::Unchecked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use crate::test_utils::{add_member, seed_club, seed_event, setup_test_db};

    fn scan(event_id: i64, membership_id: i64, status: AttendanceStatus) -> NewAttendance {
        NewAttendance {
            event_id,
            membership_id,
            status,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn append_chains_sequence_numbers() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "dave", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;

        let first = Model::append(&db, scan(event.id, member.id, AttendanceStatus::Unchecked), None)
            .await
            .unwrap();
        let second = Model::append(
            &db,
            scan(event.id, member.id, AttendanceStatus::Present),
            Some(&first),
        )
        .await
        .unwrap();

        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
        assert!(!first.is_resolved());
        assert!(second.is_resolved());

        let latest = Model::latest_for(&db, event.id, member.id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn stale_append_hits_the_unique_constraint() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "erin", club.member_role.id).await;
        let event = seed_event(&db, club.generation.id).await;

        Model::append(&db, scan(event.id, member.id, AttendanceStatus::Present), None)
            .await
            .unwrap();
        let err = Model::append(&db, scan(event.id, member.id, AttendanceStatus::Late), None)
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
        assert_eq!(Model::count_for_pair(&db, event.id, member.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn latest_with_flag_separates_scans_from_overrides() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "fay", club.member_role.id).await;
        let officer = add_member(&db, &club, "gus", club.admin_role.id).await;
        let event = seed_event(&db, club.generation.id).await;

        let scanned = Model::append(&db, scan(event.id, member.id, AttendanceStatus::Late), None)
            .await
            .unwrap();
        let changed = Model::append(
            &db,
            NewAttendance {
                is_modified: true,
                modifier_membership_id: Some(officer.id),
                ..scan(event.id, member.id, AttendanceStatus::Present)
            },
            Some(&scanned),
        )
        .await
        .unwrap();

        let by_scan = Model::latest_with_flag(&db, event.id, member.id, false)
            .await
            .unwrap()
            .unwrap();
        let by_override = Model::latest_with_flag(&db, event.id, member.id, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_scan.id, scanned.id);
        assert_eq!(by_override.id, changed.id);
        assert_eq!(by_override.modifier_membership_id, Some(officer.id));
    }

    #[test]
    fn status_strings_are_screaming_case() {
        assert_eq!(AttendanceStatus::Present.to_string(), "PRESENT");
        assert_eq!("late".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Late);
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Unchecked).unwrap(),
            "\"UNCHECKED\""
        );
    }
}
