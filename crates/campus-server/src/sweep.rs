//! Daily rental reminder/overdue sweep.
//!
//! The sweep itself lives in the store ([`Database::sweep_rentals`]); this
//! module decides when it runs and wakes the dispatcher afterwards.
//!
//! [`Database::sweep_rentals`]: campus_store::Database::sweep_rentals

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Utc};
use tokio::task::JoinHandle;

use campus_shared::constants::REMINDER_WINDOW_HOURS;
use campus_store::SweepReport;

use crate::api::AppState;
use crate::error::ApiError;

/// Interpret a wall-clock time in `offset` as a UTC instant.
pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// First instant strictly after `now` whose local time in `offset` is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let today = now.with_timezone(&offset).date_naive().and_time(at);
    let candidate = local_to_utc(today, offset);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// Run one sweep on the blocking pool and nudge the dispatcher.
pub async fn run_sweep(state: &AppState) -> Result<SweepReport, ApiError> {
    let db = Arc::clone(&state.db);
    let now = state.clock.now();

    let report = tokio::task::spawn_blocking(move || {
        db.sweep_rentals(now, Duration::hours(REMINDER_WINDOW_HOURS))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("sweep task failed: {e}")))??;

    tracing::info!(
        scanned = report.scanned,
        reminders = report.reminders_queued,
        overdue = report.marked_overdue,
        penalties = report.penalties_applied,
        skipped = report.skipped,
        "rental sweep finished"
    );

    if report.reminders_queued > 0 || report.marked_overdue > 0 {
        state.dispatcher.wake();
    }
    Ok(report)
}

/// Run the sweep every day at the configured campus-local time.
///
/// A failed run is logged and the next one is scheduled as usual.
pub fn spawn_daily(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let at = state.config.sweep_time;
        let offset = state.config.campus_offset;
        loop {
            let now = state.clock.now();
            let next = next_run_after(now, at, offset);
            tracing::debug!(next = %next, "next rental sweep scheduled");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            if let Err(e) = run_sweep(&state).await {
                tracing::error!(error = %e, "scheduled rental sweep failed");
            }
        }
    })
}
