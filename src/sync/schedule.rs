use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::refresh::Syncer;

/// Registers cron-driven background refreshes so long-lived contexts stay
/// warm even without qualifying page mutations. The TTL gate makes an
/// aggressive cadence cheap: within the window a job run touches nothing
/// but the store.
pub async fn configure_refresh_jobs(
    cron_specs: &[String],
    syncer: Arc<Syncer>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    for spec in cron_specs {
        let syncer = syncer.clone();
        let label = spec.clone();
        let job = Job::new_async(spec.as_str(), move |_id, _l| {
            let syncer = syncer.clone();
            let cron_label = label.clone();
            Box::pin(async move {
                if let Err(err) = syncer.refresh().await {
                    tracing::warn!(
                        target: "scheduler",
                        cron = %cron_label,
                        error = %err,
                        "scheduled refresh failed"
                    );
                }
            })
        })?;
        scheduler.add(job).await?;
        tracing::info!(target: "scheduler", cron = %spec, "refresh job registered");
    }
    scheduler.start().await?;
    Ok(scheduler)
}
