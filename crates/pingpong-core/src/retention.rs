use std::sync::Arc;
use std::time::Duration;

use pingpong_storage::time_utils::now_ms;
use pingpong_traits::{KvStore, StoreError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::conversation::{CONVERSATION_PREFIX, parse_conversation_key};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Maximum age of a conversation record before it is deleted.
pub const RETENTION_WINDOW_MS: i64 = 7 * DAY_MS;

pub const DEFAULT_PAGE_SIZE: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub retained: usize,
    /// Keys whose suffix is not an integer. They are kept and logged.
    pub unparsable: usize,
    pub failed: usize,
}

pub struct RetentionSweeper {
    store: Arc<dyn KvStore>,
    page_size: usize,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Records created strictly before this instant are expired.
    pub fn cutoff(now_ms: i64) -> i64 {
        now_ms.saturating_sub(RETENTION_WINDOW_MS)
    }

    /// Delete every conversation record older than the retention window.
    ///
    /// The full key set is enumerated before the first delete. A failed delete
    /// is counted and skipped; a failed listing aborts the sweep.
    pub async fn sweep(&self, now_ms: i64) -> Result<SweepReport, StoreError> {
        let cutoff = Self::cutoff(now_ms);
        let keys = self.collect_keys().await?;
        let mut report = SweepReport {
            scanned: keys.len(),
            ..SweepReport::default()
        };

        for key in keys {
            let Some(created_ms) = parse_conversation_key(&key) else {
                warn!(key = %key, "Skipping conversation key with unparsable timestamp");
                report.unparsable += 1;
                continue;
            };

            if created_ms >= cutoff {
                report.retained += 1;
                continue;
            }

            match self.store.delete(&key).await {
                Ok(_) => {
                    debug!(key = %key, "Deleted expired conversation");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to delete expired conversation");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn collect_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .store
                .list_keys(CONVERSATION_PREFIX, cursor.as_deref(), self.page_size)
                .await?;
            keys.extend(page.keys);

            match page.cursor {
                // A backend that hands back the same cursor would loop forever.
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(keys)
    }

    /// Run sweeps on a fixed period until `shutdown` fires.
    pub fn spawn(
        self: Arc<Self>,
        period: Duration,
        run_immediately: bool,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            if !run_immediately {
                // The first tick completes immediately.
                ticker.tick().await;
            }

            info!(period_secs = period.as_secs(), "Retention sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.sweep(now_ms()).await {
                            Ok(report) => info!(
                                scanned = report.scanned,
                                deleted = report.deleted,
                                unparsable = report.unparsable,
                                failed = report.failed,
                                "Retention sweep finished"
                            ),
                            Err(e) => error!(error = %e, "Retention sweep failed"),
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("Retention sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}
