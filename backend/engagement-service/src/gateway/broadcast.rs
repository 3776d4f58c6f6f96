use anyhow::Result;
use async_trait::async_trait;
use event_schema::{EngagementEvent, EngagementKind};
use tracing::debug;

use super::messages::WsServerMessage;
use super::RoomRegistry;
use crate::services::events::EngagementPublisher;

/// Bridges engine emissions into room broadcasts.
///
/// The engine publishes to this sink exactly like it publishes to the event
/// bus, so it never holds a reference to the gateway. Broadcast failures
/// are swallowed here; a slow or dead viewer must never fail the engagement
/// call that produced the event.
pub struct RoomBroadcaster {
    registry: RoomRegistry,
}

impl RoomBroadcaster {
    pub fn new(registry: RoomRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EngagementPublisher for RoomBroadcaster {
    async fn publish(&self, event: &EngagementEvent) -> Result<()> {
        // Views are too chatty to stream; rooms only carry like/comment deltas
        if event.kind == EngagementKind::Viewed {
            return Ok(());
        }

        let delivered = self
            .registry
            .broadcast(event.video_id, &WsServerMessage::engagement(event));

        debug!(
            video_id = %event.video_id,
            kind = ?event.kind,
            delivered,
            "Broadcast engagement delta to room"
        );

        Ok(())
    }
}
