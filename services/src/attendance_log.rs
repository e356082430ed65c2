//! Read-decide-append against the attendance log with conflict retry.

use db::{is_busy, is_unique_violation};
use db::models::attendance::{self, NewAttendance};
use sea_orm::{ConnectionTrait, DbErr, TransactionTrait};
use std::time::Duration;

#[derive(Debug)]
pub(crate) enum AppendOutcome {
    Appended(attendance::Model),
    /// `decide` declined; carries the latest row it saw.
    Unchanged(Option<attendance::Model>),
}

/// Reads the latest row for the pair, asks `decide` what to append and
/// appends it, all inside one transaction (a savepoint when `db` already is
/// one). Losing the sequence race rolls back and starts over with a fresh
/// read, at most `attempts` times.
pub(crate) async fn append_with_retry<C, F>(
    db: &C,
    event_id: i64,
    membership_id: i64,
    attempts: u32,
    decide: F,
) -> Result<AppendOutcome, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
    F: Fn(Option<&attendance::Model>) -> Option<NewAttendance>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let txn = db.begin().await?;
        let latest = attendance::Model::latest_for(&txn, event_id, membership_id).await?;

        let Some(new) = decide(latest.as_ref()) else {
            txn.commit().await?;
            return Ok(AppendOutcome::Unchanged(latest));
        };

        match attendance::Model::append(&txn, new, latest.as_ref()).await {
            Ok(row) => {
                txn.commit().await?;
                return Ok(AppendOutcome::Appended(row));
            }
            Err(err) if (is_unique_violation(&err) || is_busy(&err)) && attempt < attempts => {
                txn.rollback().await?;
                tracing::debug!(event_id, membership_id, attempt, "append lost a race, retrying");
                if is_busy(&err) {
                    busy_backoff(attempt).await;
                }
            }
            Err(err) => {
                txn.rollback().await?;
                return Err(err);
            }
        }
    }
}

/// Waits before retrying a write SQLite refused for lock contention. The
/// other writer has to commit before a fresh attempt can succeed.
pub(crate) async fn busy_backoff(attempt: u32) {
    tokio::time::sleep(Duration::from_millis(u64::from(attempt.min(20)) * 10)).await;
}
