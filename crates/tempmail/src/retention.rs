//! Periodic removal of expired messages and API keys.

use std::time::Duration;

use tempmail_core::{ApiKeyRepository, MessageRepository, Result};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Rows removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Messages past their expiry.
    pub messages: u64,
    /// API keys past their expiry.
    pub api_keys: u64,
}

/// Delete everything that expired at `now`.
///
/// # Errors
///
/// Returns the first database error; earlier deletions stay applied.
pub async fn sweep(
    messages: &MessageRepository,
    api_keys: &ApiKeyRepository,
    now: i64,
) -> Result<SweepReport> {
    Ok(SweepReport {
        messages: messages.purge_expired(now).await?,
        api_keys: api_keys.delete_expired(now).await?,
    })
}

/// Run [`sweep`] every `every` until the runtime shuts down.
pub fn spawn(
    messages: MessageRepository,
    api_keys: ApiKeyRepository,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match sweep(&messages, &api_keys, tempmail_core::now()).await {
                Ok(report) if report == SweepReport::default() => {
                    debug!("Retention sweep found nothing to remove");
                }
                Ok(report) => info!(
                    "Retention sweep removed {} message(s) and {} API key(s)",
                    report.messages, report.api_keys
                ),
                Err(e) => warn!("Retention sweep failed: {e}"),
            }
        }
    })
}
