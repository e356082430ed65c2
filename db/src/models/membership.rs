use super::role::{self, Capabilities, Capability};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, QueryFilter, QueryOrder, Set, sea_query::Expr};
use serde::Serialize;

/// A user's enrollment in one generation of a club.
///
/// A user may accumulate several rows for the same generation over time (e.g.
/// after leaving and rejoining); only the row with `is_current = true` counts.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "memberships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub generation_id: i64,
    pub role_id: Option<i64>,
    pub is_current: bool,
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
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id"
    )]
    Role,
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

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Enrolls a user in a generation, retiring any previous current row for
    /// the same pair.
    pub async fn create<C>(
        db: &C,
        user_id: i64,
        generation_id: i64,
        role_id: Option<i64>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::update_many()
            .col_expr(Column::IsCurrent, Expr::value(false))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::GenerationId.eq(generation_id))
            .filter(Column::IsCurrent.eq(true))
            .exec(db)
            .await?;

        ActiveModel {
            user_id: Set(user_id),
            generation_id: Set(generation_id),
            role_id: Set(role_id),
            is_current: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The user's current membership in `generation_id`, if any.
    pub async fn find_current<C>(
        db: &C,
        user_id: i64,
        generation_id: i64,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::GenerationId.eq(generation_id))
            .filter(Column::IsCurrent.eq(true))
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Every current membership of a generation, in enrollment order.
    pub async fn current_for_generation<C>(
        db: &C,
        generation_id: i64,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::GenerationId.eq(generation_id))
            .filter(Column::IsCurrent.eq(true))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Current members of a generation whose role grants `capability`.
    pub async fn current_with_capability<C>(
        db: &C,
        generation_id: i64,
        capability: Capability,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        let rows = Entity::find()
            .filter(Column::GenerationId.eq(generation_id))
            .filter(Column::IsCurrent.eq(true))
            .order_by_asc(Column::Id)
            .find_also_related(role::Entity)
            .all(db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(membership, role)| {
                role.filter(|r| r.capability_set().contains(capability))
                    .map(|_| membership)
            })
            .collect())
    }

    /// Capabilities granted through the membership's role. A membership
    /// without a role (or whose role was deleted) has none.
    pub async fn capabilities<C>(&self, db: &C) -> Result<Capabilities, DbErr>
    where
        C: ConnectionTrait,
    {
        let Some(role_id) = self.role_id else {
            return Ok(Capabilities::NONE);
        };
        Ok(role::Entity::find_by_id(role_id)
            .one(db)
            .await?
            .map(|r| r.capability_set())
            .unwrap_or(Capabilities::NONE))
    }

    /// Username behind a membership id, for display in logs and flags.
    pub async fn username<C>(db: &C, membership_id: i64) -> Result<Option<String>, DbErr>
    where
        C: ConnectionTrait,
    {
        let found = Entity::find_by_id(membership_id)
            .find_also_related(super::user::Entity)
            .one(db)
            .await?;
        Ok(found.and_then(|(_, user)| user).map(|u| u.username))
    }
}
