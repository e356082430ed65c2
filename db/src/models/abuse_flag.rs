use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Serialize;

/// Advisory note attached to an attendance row. Never blocks anything.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "abuse_flags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attendance_id: i64,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance::Entity",
        from = "Column::AttendanceId",
        to = "super::attendance::Column::Id"
    )]
    Attendance,
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C>(db: &C, attendance_id: i64, reason: &str) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            attendance_id: Set(attendance_id),
            reason: Set(reason.to_owned()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Every flag raised against rows of `event_id`, newest first.
    pub async fn find_for_event<C>(db: &C, event_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .join(JoinType::InnerJoin, Relation::Attendance.def())
            .filter(super::attendance::Column::EventId.eq(event_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    pub async fn find_for_attendance<C>(db: &C, attendance_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::{self, AttendanceStatus, NewAttendance};
    use crate::test_utils::{add_member, seed_club, seed_event, setup_test_db};

    #[tokio::test]
    async fn flags_are_scoped_to_their_event() {
        let db = setup_test_db().await;
        let club = seed_club(&db).await;
        let member = add_member(&db, &club, "jo", club.member_role.id).await;
        let event_a = seed_event(&db, club.generation.id).await;
        let event_b = seed_event(&db, club.generation.id).await;

        let row = |event_id| NewAttendance {
            event_id,
            membership_id: member.id,
            status: AttendanceStatus::Present,
            ..Default::default()
        };
        let in_a = attendance::Model::append(&db, row(event_a.id), None).await.unwrap();
        let in_b = attendance::Model::append(&db, row(event_b.id), None).await.unwrap();

        let older = Model::create(&db, in_a.id, "first").await.unwrap();
        let newer = Model::create(&db, in_a.id, "second").await.unwrap();
        Model::create(&db, in_b.id, "elsewhere").await.unwrap();

        let for_a = Model::find_for_event(&db, event_a.id).await.unwrap();
        let ids: Vec<_> = for_a.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        assert_eq!(Model::find_for_attendance(&db, in_b.id).await.unwrap().len(), 1);
    }
}
