use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::services::tenancy::TenantCache;

/// Every ten minutes, on the minute.
pub const SWEEP_SCHEDULE: &str = "0 */10 * * * *";

/// Drops expired host → slug entries so hosts that stop resolving do not
/// linger in memory.
pub async fn sweep_expired(tenants: &TenantCache) -> usize {
    let removed = tenants.sweep().await;
    let remaining = tenants.len().await;

    tracing::info!(removed, remaining, "Slug cache sweep completed");

    removed
}

/// Starts the scheduler with the sweep job registered. The returned handle
/// must be kept alive for the job to keep running.
pub async fn start(tenants: Arc<TenantCache>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(SWEEP_SCHEDULE, move |_id, _scheduler| {
        let tenants = tenants.clone();
        Box::pin(async move {
            sweep_expired(&tenants).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(schedule = SWEEP_SCHEDULE, "Slug cache sweeper scheduled");

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::services::backend::BackendClient;

    #[tokio::test]
    async fn test_sweep_on_empty_cache() {
        let backend = BackendClient::new(&Config::for_tests("http://127.0.0.1:9")).unwrap();
        let tenants = TenantCache::new(backend, Duration::from_secs(60));

        assert_eq!(sweep_expired(&tenants).await, 0);
        assert!(tenants.is_empty().await);
    }
}
