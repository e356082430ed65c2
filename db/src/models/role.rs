use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoEnumIterator};

/// A named capability set within a club.
///
/// Capabilities are stored as a bitmask (see [`Capability`]) rather than one
/// boolean column per flag, so "is this role fully privileged" is a single
/// comparison against [`Capabilities::ALL`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub club_id: i64,
    pub name: String,
    /// Raw bitmask; read it through [`Model::capability_set`].
    pub capabilities: i64,
    pub created_at: DateTime<Utc>,
}

/// A single role flag. The discriminant is the flag's bit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumIter,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u32)]
pub enum Capability {
    ManageRoles = 1 << 0,
    ManageEvents = 1 << 1,
    ManageMembers = 1 << 2,
    AcceptSignups = 1 << 3,
    ManageClubInfo = 1 << 4,
    ChangeGeneration = 1 << 5,
    ManageAttendance = 1 << 6,
    EditHistory = 1 << 7,
}

impl Capability {
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

/// Fixed-width set of [`Capability`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const ALL: Capabilities = Capabilities(0xFF);

    /// Builds a set from a persisted bitmask, dropping unknown bits.
    pub fn from_bits(bits: i64) -> Self {
        Self((bits as u32) & Self::ALL.0)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_full(self) -> bool {
        self == Self::ALL
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Capabilities::NONE, Capabilities::with)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::club::Entity",
        from = "Column::ClubId",
        to = "super::club::Column::Id"
    )]
    Club,
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
}

impl Related<super::club::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C>(
        db: &C,
        club_id: i64,
        name: &str,
        capabilities: Capabilities,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            club_id: Set(club_id),
            name: Set(name.to_owned()),
            capabilities: Set(i64::from(capabilities.bits())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The club president: every capability.
    pub async fn create_owner_role<C>(db: &C, club_id: i64) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::create(db, club_id, "owner", Capabilities::ALL).await
    }

    /// Officers: run events, accept sign-ups and manage attendance.
    pub async fn create_admin_role<C>(db: &C, club_id: i64) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let caps = [
            Capability::ManageEvents,
            Capability::AcceptSignups,
            Capability::ManageAttendance,
        ]
        .into_iter()
        .collect();
        Self::create(db, club_id, "admin", caps).await
    }

    pub async fn create_member_role<C>(db: &C, club_id: i64) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::create(db, club_id, "member", Capabilities::NONE).await
    }

    pub fn capability_set(&self) -> Capabilities {
        Capabilities::from_bits(self.capabilities)
    }

    pub fn is_fully_privileged(&self) -> bool {
        self.capability_set().is_full()
    }
}
