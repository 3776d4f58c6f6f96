//! Counter reconciliation sweep.
//!
//! The counter cache is not transactionally coupled to the ledger, so a
//! partial write (ledger committed, cache update lost) leaves the cached
//! counters stale. This job periodically recomputes the true counts for
//! recently-active videos from the ledger and overwrites any cached value
//! that diverges beyond the configured tolerance. It is a corrective sweep,
//! not a locking protocol: live traffic is never blocked.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::ReconciliationConfig;
use crate::domain::models::VideoCounters;
use crate::error::EngagementResult;
use crate::metrics::ReconciliationMetrics;
use crate::repository::EngagementLedger;
use crate::services::counters::CounterStore;

pub struct ReconciliationWorker {
    ledger: Arc<dyn EngagementLedger>,
    counters: Arc<dyn CounterStore>,
    config: ReconciliationConfig,
    metrics: ReconciliationMetrics,
}

impl ReconciliationWorker {
    pub fn new(
        ledger: Arc<dyn EngagementLedger>,
        counters: Arc<dyn CounterStore>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            ledger,
            counters,
            config,
            metrics: ReconciliationMetrics::new("engagement-service"),
        }
    }

    /// Run sweeps forever on the configured interval.
    pub async fn run(self) {
        info!(
            interval_secs = self.config.interval_secs,
            lookback_secs = self.config.lookback_secs,
            tolerance = self.config.tolerance,
            "Starting counter reconciliation worker"
        );

        loop {
            sleep(Duration::from_secs(self.config.interval_secs)).await;

            match self.sweep_once().await {
                Ok(corrected) => {
                    self.metrics.sweeps.inc();
                    if corrected > 0 {
                        warn!(corrected, "Reconciliation corrected drifted counters");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Reconciliation sweep failed, will retry next interval");
                }
            }
        }
    }

    /// One sweep over videos active within the lookback window.
    /// Returns how many videos had their cached counters overwritten.
    pub async fn sweep_once(&self) -> EngagementResult<usize> {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.lookback_secs as i64);
        let videos = self.ledger.videos_active_since(cutoff).await?;

        let mut corrected = 0;
        for video in &videos {
            let truth = VideoCounters::new(
                self.ledger.count_likes(*video).await?,
                self.ledger.count_comments(*video).await?,
                self.ledger.count_views(*video).await?,
            );

            let stale = match self.counters.get_counters(*video).await? {
                Some(cached) => cached.diverges_from(&truth, self.config.tolerance),
                None => true,
            };

            if stale {
                self.counters.put_counters(*video, truth).await?;
                self.metrics.corrected.inc();
                corrected += 1;
            }
        }

        info!(
            swept = videos.len(),
            corrected, "Reconciliation sweep complete"
        );

        Ok(corrected)
    }
}
