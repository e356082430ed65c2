pub mod models;
pub mod test_utils;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, RuntimeErr, SqlErr};
use std::path::Path;
use util::config;

pub use sea_orm::DbErr;

/// Opens the configured database.
///
/// `DATABASE_PATH` may be a full DSN or a plain SQLite file path; for the
/// latter the parent directory is created and the file is opened in
/// read-write-create mode.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let path_or_url = config::database_path();
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url
    } else {
        if let Some(parent) = Path::new(&path_or_url).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbErr::Custom(format!("Cannot create {}: {e}", parent.display())))?;
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    let db = Database::connect(&url).await?;
    if url.starts_with("sqlite:") && !url.contains(":memory:") {
        enable_wal(&db).await?;
    }
    Ok(db)
}

/// Lets readers run alongside the single writer of a SQLite file.
pub async fn enable_wal(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared("PRAGMA journal_mode=WAL").await?;
    Ok(())
}

/// True when `err` was raised by a UNIQUE constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// True when SQLite refused a write because another connection holds the
/// lock or committed after this transaction's snapshot. Retrying with a fresh
/// transaction is safe.
pub fn is_busy(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(e)) => {
            // SQLITE_BUSY, SQLITE_LOCKED and their extended codes
            matches!(e.code().as_deref(), Some("5" | "6" | "261" | "517" | "773"))
        }
        _ => false,
    }
}
