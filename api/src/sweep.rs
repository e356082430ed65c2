//! In-process finalize sweep: periodically marks unresolved members of due
//! events `ABSENT`.

use crate::state::AppState;
use chrono::Utc;
use sea_orm::DbErr;
use services::finalize::{FinalizeService, SweepReport};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs one sweep against the current time.
pub async fn run_once(app_state: &AppState) -> Result<SweepReport, DbErr> {
    FinalizeService::finalize_due_events(app_state.db(), app_state.settings(), Utc::now()).await
}

/// Spawns the sweep loop, ticking every `interval_seconds`. `0` disables it.
///
/// A tick that fails at the storage level is logged and the loop carries on.
pub fn spawn_finalize_sweep(app_state: AppState, interval_seconds: u64) -> Option<JoinHandle<()>> {
    if interval_seconds == 0 {
        tracing::info!("finalize sweep disabled");
        return None;
    }

    tracing::info!(interval_seconds, "finalize sweep started");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = run_once(&app_state).await {
                tracing::error!(error = %e, "finalize sweep tick failed");
            }
        }
    }))
}
