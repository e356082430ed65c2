use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

/// A scheduled club event.
///
/// `date` and `start_time` are wall-clock values in the deployment's fixed
/// event offset; the three `*_offset_minutes` columns are relative to that
/// start and must be non-decreasing.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub generation_id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub start_offset_minutes: i32,
    pub late_offset_minutes: i32,
    pub fail_offset_minutes: i32,
    #[serde(skip_serializing)]
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::generation::Entity",
        from = "Column::GenerationId",
        to = "super::generation::Column::Id"
    )]
    Generation,
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
}

impl Related<super::generation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Generation.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Input for [`Model::create`].
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub generation_id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub start_offset_minutes: i32,
    pub late_offset_minutes: i32,
    pub fail_offset_minutes: i32,
}

impl Model {
    /// Inserts an event with a fresh random secret.
    ///
    /// Fails with `DbErr::Custom` when the offsets are out of order.
    pub async fn create<C>(db: &C, new: NewEvent) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        if new.start_offset_minutes > new.late_offset_minutes
            || new.late_offset_minutes > new.fail_offset_minutes
        {
            return Err(DbErr::Custom(format!(
                "Event windows must satisfy start <= late <= fail (got {}, {}, {})",
                new.start_offset_minutes, new.late_offset_minutes, new.fail_offset_minutes
            )));
        }

        ActiveModel {
            generation_id: Set(new.generation_id),
            title: Set(new.title),
            date: Set(new.date),
            start_time: Set(new.start_time),
            start_offset_minutes: Set(new.start_offset_minutes),
            late_offset_minutes: Set(new.late_offset_minutes),
            fail_offset_minutes: Set(new.fail_offset_minutes),
            secret: Set(Uuid::new_v4().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Events whose date falls in `[from, to]`, oldest first.
    pub async fn find_dated_between<C>(
        db: &C,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::Date.gte(from))
            .filter(Column::Date.lte(to))
            .order_by_asc(Column::Date)
            .order_by_asc(Column::StartTime)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// The start as a naive wall-clock value; callers attach the offset.
    pub fn starts_at_local(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }
}
