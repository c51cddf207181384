//! Background job scheduler.
//!
//! Registers the recurring price update pass at server startup.

use std::sync::Arc;

use qcprice_scraper::{PriceTracker, UpdateReport};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    tracker: Arc<PriceTracker>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_price_update_job(&scheduler, tracker, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Registers the price update pass on `cron` (six fields, seconds first).
///
/// A tick that fires while the previous pass is still running is skipped.
async fn register_price_update_job(
    scheduler: &JobScheduler,
    tracker: Arc<PriceTracker>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let tracker = Arc::clone(&tracker);
        let running = Arc::clone(&running);

        Box::pin(async move {
            run_exclusive(&tracker, &running).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: price update job registered");
    Ok(())
}

/// Runs one update pass unless another is in flight. Returns `None` when
/// the pass was skipped.
async fn run_exclusive(tracker: &PriceTracker, running: &Mutex<()>) -> Option<UpdateReport> {
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("scheduler: previous price update pass still running; skipping");
        return None;
    };

    tracing::info!("scheduler: starting price update pass");
    let report = tracker.run_price_update_pass().await;
    match &report.error {
        Some(error) => tracing::error!(error = %error, "scheduler: price update pass failed"),
        None => tracing::info!(
            updated = report.updated_count,
            failed = report.failures.len(),
            "scheduler: price update pass complete"
        ),
    }
    Some(report)
}
