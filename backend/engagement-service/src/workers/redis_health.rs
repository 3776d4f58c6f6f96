//! Redis connection health check background job.
//!
//! Periodically pings the counter store to keep connections alive and to
//! detect stale connections before they cause broken pipe errors on the
//! hot counter path. Connections can go stale during periods of low
//! traffic even with server-side tcp-keepalive configured.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::services::counters::CounterStore;

/// How often to ping the counter store
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for counter store health checks
#[derive(Clone)]
pub struct RedisHealthConfig {
    pub enabled: bool,
    pub check_interval: Duration,
}

impl Default for RedisHealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: HEALTH_CHECK_INTERVAL,
        }
    }
}

/// Start the counter store health check background job
pub async fn start_redis_health_check(
    counters: Arc<dyn CounterStore>,
    config: RedisHealthConfig,
) {
    if !config.enabled {
        tracing::info!("Counter store health check disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.check_interval.as_secs(),
        "Starting counter store health check background job"
    );

    // Initial delay to let services start up
    sleep(Duration::from_secs(10)).await;

    let mut consecutive_failures = 0;
    let max_consecutive_failures = 5;

    loop {
        match counters.ping().await {
            Ok(()) => {
                if consecutive_failures > 0 {
                    tracing::info!(
                        previous_failures = consecutive_failures,
                        "Counter store connection recovered"
                    );
                }
                consecutive_failures = 0;
                tracing::debug!("Counter store health check: OK");
            }
            Err(e) => {
                consecutive_failures += 1;
                if consecutive_failures >= max_consecutive_failures {
                    tracing::error!(
                        consecutive_failures,
                        error = %e,
                        "Counter store health check: CRITICAL - multiple consecutive failures"
                    );
                } else {
                    tracing::warn!(
                        consecutive_failures,
                        error = %e,
                        "Counter store health check: FAILED"
                    );
                }
            }
        }

        sleep(config.check_interval).await;
    }
}
