use super::attendance::AttendanceStatus;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A member asking an officer to correct their attendance for one event.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "edit_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: i64,
    pub membership_id: i64,
    pub reason: String,
    /// The status the member wants recorded.
    pub status: AttendanceStatus,
    pub state: RequestState,
    pub reviewer_membership_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review state shared by edit requests and absence applications.
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "request_state")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RequestState {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
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
        from = "Column::ReviewerMembershipId",
        to = "super::membership::Column::Id"
    )]
    Reviewer,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C>(
        db: &C,
        event_id: i64,
        membership_id: i64,
        reason: &str,
        status: AttendanceStatus,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        ActiveModel {
            event_id: Set(event_id),
            membership_id: Set(membership_id),
            reason: Set(reason.to_owned()),
            status: Set(status),
            state: Set(RequestState::Pending),
            reviewer_membership_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The member's most recent request for the event.
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
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    pub async fn for_event<C>(db: &C, event_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Moves a pending request to `state`. Returns false when the request was
    /// already reviewed, so two officers cannot both decide it.
    pub async fn review<C>(
        db: &C,
        id: i64,
        state: RequestState,
        reviewer_membership_id: i64,
    ) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Entity::update_many()
            .col_expr(Column::State, Expr::value(state))
            .col_expr(Column::ReviewerMembershipId, Expr::value(reviewer_membership_id))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::State.eq(RequestState::Pending))
            .exec(db)
            .await?;
        Ok(result.rows_affected == 1)
    }
}
