//! Background schedule for account housekeeping.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::user::UserService;

/// Every day at 01:00.
const DEFAULT_PURGE_CRON: &str = "0 0 1 * * *";

/// Start the recurring purge of accounts that never finished activation.
///
/// The job runs independently of request handling, with its own transaction
/// per batch; deletion is idempotent, so an overlapping run cannot
/// double-delete.
pub async fn start(users: UserService, cron: Option<String>) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;
    let expression = cron.unwrap_or(DEFAULT_PURGE_CRON.to_string());

    let job = Job::new_async(expression.as_str(), move |_uuid, _lock| {
        let users = users.clone();
        Box::pin(async move {
            match users.remove_not_activated_users().await {
                Ok(count) => {
                    tracing::info!(count, "purged stale unactivated accounts");
                },
                Err(err) => {
                    tracing::error!(error = %err, "stale account purge failed");
                },
            }
        })
    })?;

    sched.add(job).await?;
    sched.start().await?;

    tracing::debug!(cron = expression, "account purge scheduled");

    Ok(sched)
}
