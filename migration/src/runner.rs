use migration::Migrator;
use colored::*;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 80;

/// Applies every pending migration one at a time, printing a status line
/// per migration. Exits the process on the first failure.
pub async fn run_pending_migrations(url: &str) {
    let db = sea_orm::Database::connect(url)
        .await
        .expect("DB connection failed");

    let pending = match Migrator::get_pending_migrations(&db).await {
        Ok(pending) => pending,
        Err(err) => {
            println!("{} {}", "failed to read migration state:".red(), err);
            std::process::exit(1);
        }
    };

    if pending.is_empty() {
        println!("Nothing to migrate");
        return;
    }

    println!("Running {} migration(s)...", pending.len());
    for migration in pending {
        run_next(&db, migration.name()).await;
    }
}

async fn run_next(db: &DatabaseConnection, name: &str) {
    let name_str = format!("Applying {}", name.bold());
    let dots = ".".repeat(STATUS_COLUMN.saturating_sub(name_str.len()));
    print!("{}{} ", name_str, dots);
    io::stdout().flush().ok();

    let start = Instant::now();
    match Migrator::up(db, Some(1)).await {
        Ok(()) => {
            let time_str = format!("({:.2?})", start.elapsed()).dimmed();
            println!("{} {}", "done".green(), time_str);
        }
        Err(err) => {
            println!("{} {}", "failed".red(), err);
            std::process::exit(1);
        }
    }
}
