use chrono::{DateTime, Utc};
/// Event schema registry for the engagement pipeline.
///
/// Defines the versioned envelope every Kafka message travels in, the typed
/// identifiers shared between the engine and the fan-out gateway, and the
/// engagement event payload consumed by notification/analytics subscribers.
/// Each envelope carries a required `schema_version` field so consumers can
/// reject payloads they do not understand.
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Current schema version for all events
pub const SCHEMA_VERSION: u32 = 1;

/// Identifier of a video, the partitioning unit for all engagement traffic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VideoId(Uuid);

impl VideoId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of an authenticated user performing an engagement action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ActorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a comment row in the engagement ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommentId(Uuid);

impl CommentId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for CommentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Base event envelope for all Kafka messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event ID for idempotency and tracing
    pub event_id: Uuid,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Schema version for compatibility checking
    pub schema_version: u32,
    /// Source service that generated the event
    pub source: String,
    /// Dotted event type, also sent as a Kafka header for consumer routing
    pub event_type: String,
    /// Correlation ID for distributed tracing
    pub correlation_id: Option<Uuid>,
    /// Actual event payload
    pub data: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            schema_version: SCHEMA_VERSION,
            source: source.into(),
            event_type: event_type.into(),
            correlation_id: None,
            data,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

// ============================================================================
// ENGAGEMENT EVENTS
// ============================================================================

/// The kind of engagement action an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Liked,
    Unliked,
    Commented,
    CommentDeleted,
    Viewed,
}

impl EngagementKind {
    /// Dotted event type used in the envelope and the Kafka routing header.
    pub fn event_type(&self) -> &'static str {
        match self {
            EngagementKind::Liked => "engagement.like.created",
            EngagementKind::Unliked => "engagement.like.deleted",
            EngagementKind::Commented => "engagement.comment.created",
            EngagementKind::CommentDeleted => "engagement.comment.deleted",
            EngagementKind::Viewed => "engagement.view.recorded",
        }
    }
}

/// An immutable engagement fact, appended to the bus after the corresponding
/// ledger write has committed. `actor_id` is absent for anonymous views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub kind: EngagementKind,
    pub video_id: VideoId,
    pub actor_id: Option<ActorId>,
    /// Set for comment lifecycle events
    pub comment_id: Option<CommentId>,
    /// The aggregate value for `kind`'s counter after this action
    pub resulting_count: i64,
    pub occurred_at: DateTime<Utc>,
}

impl EngagementEvent {
    /// Kafka partition key. Keying by video keeps per-video ordering, so a
    /// comment-deleted event can never overtake the comment it deletes.
    pub fn partition_key(&self) -> String {
        self.video_id.to_string()
    }
}

// ============================================================================
// Version compatibility helpers
// ============================================================================

pub fn is_compatible(current_version: u32, message_version: u32) -> bool {
    // For now, enforce exact version match
    current_version == message_version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope_creation() {
        let event = EngagementEvent {
            kind: EngagementKind::Liked,
            video_id: VideoId::new(Uuid::new_v4()),
            actor_id: Some(ActorId::new(Uuid::new_v4())),
            comment_id: None,
            resulting_count: 1,
            occurred_at: Utc::now(),
        };

        let envelope = EventEnvelope::new("engagement-service", event.kind.event_type(), event);
        assert_eq!(envelope.schema_version, SCHEMA_VERSION);
        assert_eq!(envelope.source, "engagement-service");
        assert_eq!(envelope.event_type, "engagement.like.created");
        assert!(envelope.correlation_id.is_none());
    }

    #[test]
    fn test_partition_key_is_video_id() {
        let video_id = VideoId::new(Uuid::new_v4());
        let event = EngagementEvent {
            kind: EngagementKind::Viewed,
            video_id,
            actor_id: None,
            comment_id: None,
            resulting_count: 7,
            occurred_at: Utc::now(),
        };

        assert_eq!(event.partition_key(), video_id.to_string());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EngagementKind::CommentDeleted).unwrap();
        assert_eq!(json, "\"comment_deleted\"");
    }

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible(SCHEMA_VERSION, SCHEMA_VERSION));
        assert!(!is_compatible(1, 2));
    }
}
