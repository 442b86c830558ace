use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::services::reservation;
use crate::state::AppState;

/// Background task that purges expired slot locks and force-expires PENDING
/// bookings whose TTL has lapsed. Correctness never depends on it: every
/// read path already treats expired locks as absent.
pub async fn run_sweeper(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(state.config.sweep_interval_secs));
    loop {
        interval.tick().await;
        let now = Utc::now();

        let purged = state.locks.purge_expired(now);
        if purged > 0 {
            tracing::debug!(purged, "purged expired slot locks");
        }

        let expired = {
            let db = state.db.lock().unwrap();
            reservation::sweep_expired_pending(&db, &state.locks, &state.config, now)
        };
        match expired {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "expired stale pending bookings"),
            Err(e) => tracing::warn!("pending booking sweep failed: {e}"),
        }
    }
}
