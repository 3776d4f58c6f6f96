use dashmap::DashMap;
use event_schema::{ActorId, VideoId};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod auth;
pub mod broadcast;
pub mod messages;
pub mod session;

pub use auth::{AuthError, CredentialVerifier, HttpCredentialVerifier};
pub use broadcast::RoomBroadcaster;
pub use messages::{WsClientMessage, WsServerMessage};
pub use session::{ws_handler, GatewayState};

use crate::metrics::GatewayMetrics;

/// Unique identifier for a gateway connection.
///
/// Each WebSocket connection gets a unique id when it registers, allowing
/// precise cleanup when the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber entry with connection id and outbound channel
struct RoomSubscriber {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Room registry for the fan-out gateway.
///
/// Tracks which connections are subscribed to which video's room, plus a
/// direct actor index for unicast delivery. Rooms live in a sharded
/// concurrent map so unrelated videos' broadcasts never contend on one
/// lock. Sends are non-blocking channel pushes; a failed send prunes that
/// subscriber, and a room whose subscriber set empties is removed.
#[derive(Clone)]
pub struct RoomRegistry {
    // video_id -> subscribers of that video's room
    rooms: Arc<DashMap<VideoId, Vec<RoomSubscriber>>>,
    // actor_id -> that actor's live connections, for unicast
    actors: Arc<DashMap<ActorId, Vec<(ConnectionId, UnboundedSender<String>)>>>,
    metrics: GatewayMetrics,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            actors: Arc::new(DashMap::new()),
            metrics: GatewayMetrics::new("engagement-service"),
        }
    }

    /// Register an authenticated connection in the actor index.
    pub fn register_connection(
        &self,
        connection: ConnectionId,
        actor: ActorId,
        sender: UnboundedSender<String>,
    ) {
        self.actors
            .entry(actor)
            .or_default()
            .push((connection, sender));
        self.metrics.connections.inc();

        debug!(
            connection_id = %connection.as_uuid(),
            actor_id = %actor,
            "Gateway connection registered"
        );
    }

    /// Remove a connection from every room it joined and the actor index.
    /// Must be called when the connection closes.
    pub fn remove_connection(&self, connection: ConnectionId, actor: ActorId) {
        self.rooms.retain(|_, subscribers| {
            subscribers.retain(|s| s.id != connection);
            !subscribers.is_empty()
        });

        let mut actor_gone = false;
        if let Some(mut connections) = self.actors.get_mut(&actor) {
            let before = connections.len();
            connections.retain(|(id, _)| *id != connection);
            if before != connections.len() {
                self.metrics.connections.dec();
            }
            actor_gone = connections.is_empty();
        }
        if actor_gone {
            self.actors.remove_if(&actor, |_, connections| connections.is_empty());
        }

        debug!(
            connection_id = %connection.as_uuid(),
            actor_id = %actor,
            "Gateway connection removed"
        );
    }

    /// Add a connection to a video's room. Idempotent per connection.
    pub fn subscribe(
        &self,
        video: VideoId,
        connection: ConnectionId,
        sender: UnboundedSender<String>,
    ) {
        let mut room = self.rooms.entry(video).or_default();
        if room.iter().any(|s| s.id == connection) {
            return;
        }
        room.push(RoomSubscriber {
            id: connection,
            sender,
        });

        debug!(
            video_id = %video,
            connection_id = %connection.as_uuid(),
            subscribers = room.len(),
            "Subscribed connection to room"
        );
    }

    /// Remove a connection from a video's room.
    pub fn unsubscribe(&self, video: VideoId, connection: ConnectionId) {
        let emptied = match self.rooms.get_mut(&video) {
            Some(mut room) => {
                room.retain(|s| s.id != connection);
                room.is_empty()
            }
            None => false,
        };

        if emptied {
            self.rooms.remove_if(&video, |_, room| room.is_empty());
            debug!(video_id = %video, "Removed empty room from registry");
        }
    }

    /// Broadcast a message to every subscriber of a video's room.
    ///
    /// Delivery is best-effort per connection: the channel push never
    /// blocks, and a subscriber whose send fails is pruned from the room.
    /// Returns the number of subscribers reached.
    pub fn broadcast(&self, video: VideoId, message: &WsServerMessage) -> usize {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(video_id = %video, error = %err, "Failed to serialize broadcast payload");
                return 0;
            }
        };

        let mut delivered = 0;
        let emptied = match self.rooms.get_mut(&video) {
            Some(mut room) => {
                let before = room.len();
                room.retain(|subscriber| {
                    let ok = subscriber.sender.send(payload.clone()).is_ok();
                    if ok {
                        delivered += 1;
                    }
                    ok
                });

                let pruned = before - room.len();
                if pruned > 0 {
                    self.metrics.pruned_subscribers.inc_by(pruned as u64);
                    debug!(
                        video_id = %video,
                        pruned,
                        active = room.len(),
                        "Pruned dead subscribers during broadcast"
                    );
                }
                room.is_empty()
            }
            None => false,
        };

        if emptied {
            self.rooms.remove_if(&video, |_, room| room.is_empty());
        }

        self.metrics.broadcasts.inc_by(delivered as u64);
        delivered
    }

    /// Deliver a message to every live connection of one actor, bypassing
    /// rooms (personal notifications). Returns connections reached.
    pub fn unicast(&self, actor: ActorId, message: &WsServerMessage) -> usize {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(actor_id = %actor, error = %err, "Failed to serialize unicast payload");
                return 0;
            }
        };

        let mut delivered = 0;
        let emptied = match self.actors.get_mut(&actor) {
            Some(mut connections) => {
                let before = connections.len();
                connections.retain(|(_, sender)| {
                    let ok = sender.send(payload.clone()).is_ok();
                    if ok {
                        delivered += 1;
                    }
                    ok
                });
                let pruned = before - connections.len();
                if pruned > 0 {
                    self.metrics.pruned_subscribers.inc_by(pruned as u64);
                }
                connections.is_empty()
            }
            None => false,
        };

        if emptied {
            self.actors.remove_if(&actor, |_, connections| connections.is_empty());
        }

        delivered
    }

    /// Subscriber count for a room (for debugging/metrics)
    pub fn room_size(&self, video: VideoId) -> usize {
        self.rooms.get(&video).map(|room| room.len()).unwrap_or(0)
    }

    /// Live connection count for an actor
    pub fn connection_count(&self, actor: ActorId) -> usize {
        self.actors
            .get(&actor)
            .map(|connections| connections.len())
            .unwrap_or(0)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_schema::EngagementKind;
    use tokio::sync::mpsc;

    fn delta(video: VideoId) -> WsServerMessage {
        WsServerMessage::Engagement {
            video_id: video,
            kind: EngagementKind::Liked,
            actor_id: None,
            comment_id: None,
            resulting_count: 1,
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_broadcast() {
        let registry = RoomRegistry::new();
        let video = VideoId::new(Uuid::new_v4());
        let connection = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.subscribe(video, connection, tx);
        assert_eq!(registry.room_size(video), 1);

        let delivered = registry.broadcast(video, &delta(video));
        assert_eq!(delivered, 1);

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("\"engagement\""));
        assert!(payload.contains(&video.to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_skips_other_rooms() {
        let registry = RoomRegistry::new();
        let video_a = VideoId::new(Uuid::new_v4());
        let video_b = VideoId::new(Uuid::new_v4());
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.subscribe(video_a, ConnectionId::new(), tx);

        assert_eq!(registry.broadcast(video_b, &delta(video_b)), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_subscriber_pruned_on_broadcast() {
        let registry = RoomRegistry::new();
        let video = VideoId::new(Uuid::new_v4());
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();

        registry.subscribe(video, ConnectionId::new(), dead_tx);
        registry.subscribe(video, ConnectionId::new(), live_tx);
        drop(dead_rx);

        let delivered = registry.broadcast(video, &delta(video));
        assert_eq!(delivered, 1);
        assert_eq!(registry.room_size(video), 1);
        assert!(live_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent_per_connection() {
        let registry = RoomRegistry::new();
        let video = VideoId::new(Uuid::new_v4());
        let connection = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.subscribe(video, connection, tx.clone());
        registry.subscribe(video, connection, tx);
        assert_eq!(registry.room_size(video), 1);

        registry.broadcast(video, &delta(video));
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_empty_room() {
        let registry = RoomRegistry::new();
        let video = VideoId::new(Uuid::new_v4());
        let connection = ConnectionId::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        registry.subscribe(video, connection, tx);
        registry.unsubscribe(video, connection);

        assert_eq!(registry.room_size(video), 0);
        assert_eq!(registry.broadcast(video, &delta(video)), 0);
    }

    #[tokio::test]
    async fn test_remove_connection_cleans_all_rooms() {
        let registry = RoomRegistry::new();
        let actor = ActorId::new(Uuid::new_v4());
        let connection = ConnectionId::new();
        let video_a = VideoId::new(Uuid::new_v4());
        let video_b = VideoId::new(Uuid::new_v4());
        let (tx, _rx) = mpsc::unbounded_channel();

        registry.register_connection(connection, actor, tx.clone());
        registry.subscribe(video_a, connection, tx.clone());
        registry.subscribe(video_b, connection, tx);

        registry.remove_connection(connection, actor);

        assert_eq!(registry.room_size(video_a), 0);
        assert_eq!(registry.room_size(video_b), 0);
        assert_eq!(registry.connection_count(actor), 0);
    }

    #[tokio::test]
    async fn test_unicast_reaches_only_target_actor() {
        let registry = RoomRegistry::new();
        let actor = ActorId::new(Uuid::new_v4());
        let other = ActorId::new(Uuid::new_v4());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();

        registry.register_connection(ConnectionId::new(), actor, tx);
        registry.register_connection(ConnectionId::new(), other, other_tx);

        let video = VideoId::new(Uuid::new_v4());
        let delivered = registry.unicast(actor, &delta(video));

        assert_eq!(delivered, 1);
        assert!(rx.recv().await.is_some());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_multiple_connections_per_actor() {
        let registry = RoomRegistry::new();
        let actor = ActorId::new(Uuid::new_v4());

        for _ in 0..3 {
            let (tx, _rx) = mpsc::unbounded_channel();
            registry.register_connection(ConnectionId::new(), actor, tx);
        }

        assert_eq!(registry.connection_count(actor), 3);
    }
}
