use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::Serialize;

/// Represents a user in the `users` table.
///
/// Users are owned by the external identity layer; this table only carries
/// what attendance needs to render names and correlate devices.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique display name.
    #[sea_orm(unique)]
    pub username: String,
    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::device_token::Entity")]
    DeviceTokens,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::device_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C>(db: &C, username: &str) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            username: Set(username.to_owned()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }
}
