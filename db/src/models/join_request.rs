use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, PaginatorTrait, QueryFilter, Set};
use serde::Serialize;

/// A sign-up awaiting (or past) officer approval.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "join_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub generation_id: i64,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::generation::Entity",
        from = "Column::GenerationId",
        to = "super::generation::Column::Id"
    )]
    Generation,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::generation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Generation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C>(db: &C, user_id: i64, generation_id: i64) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            user_id: Set(user_id),
            generation_id: Set(generation_id),
            accepted: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Whether the user has an unaccepted request for the generation.
    pub async fn has_pending<C>(db: &C, user_id: i64, generation_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let count = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::GenerationId.eq(generation_id))
            .filter(Column::Accepted.eq(false))
            .count(db)
            .await?;
        Ok(count > 0)
    }
}
