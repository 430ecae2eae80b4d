use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::state::AppState;

/// Starts the background sweep of abandoned pending signups. Rows are only
/// deleted well past their expiry (default 24h), so a user still cycling
/// through expired-code rotations is never swept mid-flow.
pub fn start_pending_sweeper(state: AppState) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.otp.sweep_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_sweep(&state).await;
        }
    })
}

async fn run_sweep(state: &AppState) {
    debug!("running pending signup sweep");

    let result = sqlx::query(
        "DELETE FROM pending_signups WHERE expires_at < NOW() - ($1 * INTERVAL '1 hour')",
    )
    .bind(state.config.otp.abandoned_after_hours)
    .execute(&state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => {
            debug!(swept = done.rows_affected(), "abandoned pending signups deleted")
        }
        Err(e) => error!(error = %e, "pending signup sweep failed"),
        _ => {}
    }
}
