//! Test databases and fixtures shared by unit and integration tests.

use crate::models::{club, event, generation, membership, role, user};
use chrono::{NaiveDate, NaiveTime};
use migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A fresh SQLite file under the temp dir, in WAL mode and migrated. Unlike
/// the in-memory database it is served by a real pool, so concurrent tasks get
/// their own connections and contend for the write lock.
pub async fn setup_file_test_db() -> DatabaseConnection {
    let path = std::env::temp_dir().join(format!("attendance-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let mut options = ConnectOptions::new(url);
    options.max_connections(8).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open test database file");

    crate::enable_wal(&db).await.expect("Failed to enable WAL");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A club with one generation and the three preset roles.
#[derive(Debug, Clone)]
pub struct SeededClub {
    pub club: club::Model,
    pub generation: generation::Model,
    pub owner_role: role::Model,
    pub admin_role: role::Model,
    pub member_role: role::Model,
}

pub async fn seed_club(db: &DatabaseConnection) -> SeededClub {
    seed_named_club(db, "Chess Club").await
}

pub async fn seed_named_club(db: &DatabaseConnection, name: &str) -> SeededClub {
    let club = club::Model::create(db, name)
        .await
        .expect("Failed to create club");
    let generation = generation::Model::create(
        db,
        club.id,
        "Spring 2025",
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
        NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
    )
    .await
    .expect("Failed to create generation");

    SeededClub {
        owner_role: role::Model::create_owner_role(db, club.id)
            .await
            .expect("Failed to create owner role"),
        admin_role: role::Model::create_admin_role(db, club.id)
            .await
            .expect("Failed to create admin role"),
        member_role: role::Model::create_member_role(db, club.id)
            .await
            .expect("Failed to create member role"),
        club,
        generation,
    }
}

/// Creates a user and enrolls them in the seeded generation.
pub async fn add_member(
    db: &DatabaseConnection,
    seeded: &SeededClub,
    username: &str,
    role_id: i64,
) -> membership::Model {
    let user = user::Model::create(db, username)
        .await
        .expect("Failed to create user");
    membership::Model::create(db, user.id, seeded.generation.id, Some(role_id))
        .await
        .expect("Failed to create membership")
}

/// 2025-03-14 10:00 with windows at -10 / +10 / +30 minutes.
pub async fn seed_event(db: &DatabaseConnection, generation_id: i64) -> event::Model {
    seed_event_at(
        db,
        generation_id,
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"),
        NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
        (-10, 10, 30),
    )
    .await
}

pub async fn seed_event_at(
    db: &DatabaseConnection,
    generation_id: i64,
    date: NaiveDate,
    start_time: NaiveTime,
    (start, late, fail): (i32, i32, i32),
) -> event::Model {
    event::Model::create(
        db,
        event::NewEvent {
            generation_id,
            title: "Weekly meeting".into(),
            date,
            start_time,
            start_offset_minutes: start,
            late_offset_minutes: late,
            fail_offset_minutes: fail,
        },
    )
    .await
    .expect("Failed to create event")
}
