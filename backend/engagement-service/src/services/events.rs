//! Publisher seam between the engagement engine and its downstream sinks.
//!
//! The engine emits an [`EngagementEvent`] value through this interface and
//! holds no reference to Kafka or the fan-out gateway, so sinks can be
//! swapped or stacked without touching engine logic.

use anyhow::Result;
use async_trait::async_trait;
use event_schema::EngagementEvent;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait EngagementPublisher: Send + Sync {
    async fn publish(&self, event: &EngagementEvent) -> Result<()>;
}

/// Fans one emission out to several sinks (event bus, room gateway).
///
/// A failing sink is logged and skipped - a dead bus or a slow room must
/// never fail the engagement call that already committed to the ledger.
pub struct CompositePublisher {
    sinks: Vec<Arc<dyn EngagementPublisher>>,
}

impl CompositePublisher {
    pub fn new(sinks: Vec<Arc<dyn EngagementPublisher>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EngagementPublisher for CompositePublisher {
    async fn publish(&self, event: &EngagementEvent) -> Result<()> {
        for sink in &self.sinks {
            if let Err(err) = sink.publish(event).await {
                warn!(
                    error = ?err,
                    kind = ?event.kind,
                    video_id = %event.video_id,
                    "Engagement event sink failed, continuing with remaining sinks"
                );
            }
        }
        Ok(())
    }
}

/// Sink for deployments without an event bus configured.
#[derive(Default, Clone)]
pub struct NoopPublisher;

#[async_trait]
impl EngagementPublisher for NoopPublisher {
    async fn publish(&self, event: &EngagementEvent) -> Result<()> {
        debug!(
            kind = ?event.kind,
            video_id = %event.video_id,
            "Event bus disabled, dropping engagement event"
        );
        Ok(())
    }
}
