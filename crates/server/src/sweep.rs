//! Background sweep of expired staged chunks.

use crate::state::AppState;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

/// Spawn the staging sweep task.
///
/// Each tick deletes staged chunks older than `retention.max_age_secs`.
/// Abandoned uploads therefore disappear within one sweep interval of
/// expiring. Failures are logged and superseded by the next run.
pub fn spawn_sweep_task(state: AppState) -> JoinHandle<()> {
    let interval = state.config.retention.sweep_interval();
    let max_age = state.config.retention.max_age();

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let cutoff = OffsetDateTime::now_utc() - max_age;
            match state.store.sweep_expired(cutoff).await {
                Ok(removed) => {
                    tracing::debug!(removed, "Staged chunk sweep finished");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Staged chunk sweep failed");
                }
            }
        }
    })
}
