use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{QueryFilter, Set};
use serde::Serialize;

/// Opaque per-installation identifier. Used to correlate check-ins, never to
/// authorize them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "device_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[sea_orm(unique)]
    pub token: String,
    pub model: Option<String>,
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
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Returns the row for `token`, inserting it for `user_id` first if it
    /// does not exist yet. A token already registered by someone else is
    /// returned as-is.
    pub async fn find_or_create<C>(
        db: &C,
        user_id: i64,
        token: &str,
        model: Option<&str>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let candidate = ActiveModel {
            user_id: Set(user_id),
            token: Set(token.to_owned()),
            model: Set(model.map(str::to_owned)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        Entity::insert(candidate)
            .on_conflict(OnConflict::column(Column::Token).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;

        Entity::find()
            .filter(Column::Token.eq(token))
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("device token {token}")))
    }
}
