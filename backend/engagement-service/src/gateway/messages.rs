//! Wire messages exchanged with gateway clients.
//!
//! Room keys and raw uuids exist only here, at the boundary; everything
//! behind the gateway traffics in the typed identifiers.

use event_schema::{ActorId, CommentId, EngagementEvent, EngagementKind, VideoId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages a client may send after the connection is established.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    /// Join the room for a video
    Subscribe { video_id: Uuid },
    /// Leave the room for a video
    Unsubscribe { video_id: Uuid },
}

/// Messages the gateway pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// Sent once after a successful connect
    Connected { connection_id: Uuid },
    Subscribed { video_id: VideoId },
    Unsubscribed { video_id: VideoId },
    /// An engagement delta for a subscribed video
    Engagement {
        video_id: VideoId,
        kind: EngagementKind,
        actor_id: Option<ActorId>,
        comment_id: Option<CommentId>,
        resulting_count: i64,
    },
    Error { code: String, message: String },
}

impl WsServerMessage {
    pub fn engagement(event: &EngagementEvent) -> Self {
        WsServerMessage::Engagement {
            video_id: event.video_id,
            kind: event.kind,
            actor_id: event.actor_id,
            comment_id: event.comment_id,
            resulting_count: event.resulting_count,
        }
    }
}
