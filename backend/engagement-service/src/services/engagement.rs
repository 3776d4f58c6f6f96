//! The engagement engine.
//!
//! Orchestrates, for each action: the dedup check, the ledger write, the
//! atomic counter update, and the event emission. All cross-process
//! coordination happens through the atomic primitives of the counter store;
//! the engine itself keeps no mutable state and may run as many replicas.

use chrono::Utc;
use event_schema::{ActorId, CommentId, EngagementEvent, EngagementKind, VideoId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::counters::{CounterStore, MembershipUpdate};
use super::events::EngagementPublisher;
use crate::domain::models::{CommentOutcome, LikeOutcome, VideoCounters};
use crate::error::{EngagementError, EngagementResult};
use crate::repository::EngagementLedger;

/// Ceiling on comment length, in characters
const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Clone)]
pub struct EngagementService {
    ledger: Arc<dyn EngagementLedger>,
    counters: Arc<dyn CounterStore>,
    publisher: Arc<dyn EngagementPublisher>,
}

impl EngagementService {
    pub fn new(
        ledger: Arc<dyn EngagementLedger>,
        counters: Arc<dyn CounterStore>,
        publisher: Arc<dyn EngagementPublisher>,
    ) -> Self {
        Self {
            ledger,
            counters,
            publisher,
        }
    }

    /// Record a like.
    ///
    /// The counter store's atomic set-add arbitrates concurrent likes from
    /// the same actor; the ledger's UNIQUE constraint is the durable
    /// backstop. A cache failure after the ledger write committed is
    /// absorbed: the call still succeeds with the ledger's count and the
    /// reconciliation sweep corrects the cache.
    pub async fn like(&self, actor: ActorId, video: VideoId) -> EngagementResult<LikeOutcome> {
        if self.is_engaged(actor, video).await? {
            return Err(EngagementError::AlreadyEngaged);
        }

        let inserted = self.ledger.insert_like(actor, video).await?;
        if inserted.is_none() {
            // Duplicate row: make sure the membership set agrees with the ledger
            if let Err(err) = self.counters.add_member(video, actor).await {
                self.log_drift(video, &err);
            }
            return Err(EngagementError::AlreadyEngaged);
        }

        let likes = match self.counters.like_added(video, actor).await {
            Ok(MembershipUpdate::Applied { count }) => count,
            Ok(MembershipUpdate::Unchanged) => {
                // A concurrent twin won the set-add; it owns the increment
                return Err(EngagementError::AlreadyEngaged);
            }
            Err(err) => {
                self.log_drift(video, &err);
                self.ledger.count_likes(video).await.unwrap_or(1)
            }
        };

        self.emit(EngagementEvent {
            kind: EngagementKind::Liked,
            video_id: video,
            actor_id: Some(actor),
            comment_id: None,
            resulting_count: likes,
            occurred_at: Utc::now(),
        })
        .await;

        Ok(LikeOutcome { likes })
    }

    /// Remove a like. Requires an existing like; `NotEngaged` otherwise.
    pub async fn unlike(&self, actor: ActorId, video: VideoId) -> EngagementResult<LikeOutcome> {
        if !self.is_engaged(actor, video).await? {
            return Err(EngagementError::NotEngaged);
        }

        let removed = self.ledger.delete_like(actor, video).await?;
        if !removed {
            // The ledger never held the row; drop any stale membership
            if let Err(err) = self.counters.remove_member(video, actor).await {
                self.log_drift(video, &err);
            }
            return Err(EngagementError::NotEngaged);
        }

        let likes = match self.counters.like_removed(video, actor).await {
            Ok(MembershipUpdate::Applied { count }) => count,
            Ok(MembershipUpdate::Unchanged) => {
                // Ledger row existed without cache membership: count from truth
                self.ledger.count_likes(video).await.unwrap_or(0)
            }
            Err(err) => {
                self.log_drift(video, &err);
                self.ledger.count_likes(video).await.unwrap_or(0)
            }
        };

        self.emit(EngagementEvent {
            kind: EngagementKind::Unliked,
            video_id: video,
            actor_id: Some(actor),
            comment_id: None,
            resulting_count: likes,
            occurred_at: Utc::now(),
        })
        .await;

        Ok(LikeOutcome { likes })
    }

    /// Add a comment. Comments are never deduplicated.
    pub async fn add_comment(
        &self,
        actor: ActorId,
        video: VideoId,
        content: &str,
    ) -> EngagementResult<CommentOutcome> {
        if content.trim().is_empty() {
            return Err(EngagementError::InvalidContent(
                "comment must not be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(EngagementError::InvalidContent(format!(
                "comment exceeds {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let comment = self.ledger.insert_comment(actor, video, content).await?;

        let comments = match self.counters.incr_comments(video).await {
            Ok(count) => count,
            Err(err) => {
                self.log_drift(video, &err);
                self.ledger.count_comments(video).await.unwrap_or(1)
            }
        };

        self.emit(EngagementEvent {
            kind: EngagementKind::Commented,
            video_id: video,
            actor_id: Some(actor),
            comment_id: Some(CommentId::from(comment.id)),
            resulting_count: comments,
            occurred_at: Utc::now(),
        })
        .await;

        Ok(CommentOutcome { comment, comments })
    }

    /// Soft-delete a comment. Only its author may delete it.
    /// Returns the live comment count after deletion.
    pub async fn delete_comment(
        &self,
        comment_id: CommentId,
        actor: ActorId,
    ) -> EngagementResult<i64> {
        let comment = self
            .ledger
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| EngagementError::NotFound(format!("comment {}", comment_id)))?;

        if comment.user_id != actor.as_uuid() {
            return Err(EngagementError::Forbidden);
        }

        let video = self
            .ledger
            .soft_delete_comment(comment_id, actor)
            .await?
            // A concurrent delete got there first
            .ok_or_else(|| EngagementError::NotFound(format!("comment {}", comment_id)))?;

        let comments = match self.counters.decr_comments(video).await {
            Ok(count) => count,
            Err(err) => {
                self.log_drift(video, &err);
                self.ledger.count_comments(video).await.unwrap_or(0)
            }
        };

        self.emit(EngagementEvent {
            kind: EngagementKind::CommentDeleted,
            video_id: video,
            actor_id: Some(actor),
            comment_id: Some(comment_id),
            resulting_count: comments,
            occurred_at: Utc::now(),
        })
        .await;

        Ok(comments)
    }

    /// Record a view. Intentionally not deduplicated: repeat views from the
    /// same actor all count, and anonymous views are allowed.
    pub async fn record_view(
        &self,
        video: VideoId,
        actor: Option<ActorId>,
    ) -> EngagementResult<i64> {
        self.ledger.insert_view(video, actor).await?;

        let views = match self.counters.incr_views(video).await {
            Ok(count) => count,
            Err(err) => {
                self.log_drift(video, &err);
                self.ledger.count_views(video).await.unwrap_or(1)
            }
        };

        self.emit(EngagementEvent {
            kind: EngagementKind::Viewed,
            video_id: video,
            actor_id: actor,
            comment_id: None,
            resulting_count: views,
            occurred_at: Utc::now(),
        })
        .await;

        Ok(views)
    }

    /// "Has this actor liked this video" - pure read, no side effects.
    pub async fn like_status(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool> {
        self.is_engaged(actor, video).await
    }

    /// Aggregate counters for one video, cache-first with ledger fallback.
    /// A miss warms the cache for subsequent readers.
    pub async fn counters(&self, video: VideoId) -> EngagementResult<VideoCounters> {
        match self.counters.get_counters(video).await {
            Ok(Some(counters)) => Ok(counters),
            Ok(None) => {
                let truth = self.ledger_counters(video).await?;
                if let Err(err) = self.counters.put_counters(video, truth).await {
                    warn!(video_id = %video, error = %err, "Failed to warm counter cache");
                }
                Ok(truth)
            }
            Err(err) => {
                warn!(video_id = %video, error = %err, "Counter cache unavailable, serving ledger counts");
                self.ledger_counters(video).await
            }
        }
    }

    /// Batch counter read for feed rendering: one cache round-trip, ledger
    /// fallback per miss.
    pub async fn batch_counters(
        &self,
        videos: &[VideoId],
    ) -> EngagementResult<HashMap<VideoId, VideoCounters>> {
        let cached = match self.counters.batch_get_counters(videos).await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(error = %err, video_count = videos.len(), "Batch counter read failed, falling back to ledger");
                HashMap::new()
            }
        };

        let mut result = HashMap::with_capacity(videos.len());
        for video in videos {
            match cached.get(video).copied().flatten() {
                Some(counters) => {
                    result.insert(*video, counters);
                }
                None => {
                    let truth = self.ledger_counters(*video).await?;
                    if let Err(err) = self.counters.put_counters(*video, truth).await {
                        warn!(video_id = %video, error = %err, "Failed to warm counter cache");
                    }
                    result.insert(*video, truth);
                }
            }
        }

        Ok(result)
    }

    /// Membership check with ledger fallback when the cache is unreachable
    /// or has expired the set.
    async fn is_engaged(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool> {
        match self.counters.is_member(video, actor).await {
            Ok(true) => Ok(true),
            Ok(false) => self.ledger.has_like(actor, video).await,
            Err(err) => {
                warn!(video_id = %video, error = %err, "Membership cache unavailable, checking ledger");
                self.ledger.has_like(actor, video).await
            }
        }
    }

    async fn ledger_counters(&self, video: VideoId) -> EngagementResult<VideoCounters> {
        Ok(VideoCounters::new(
            self.ledger.count_likes(video).await?,
            self.ledger.count_comments(video).await?,
            self.ledger.count_views(video).await?,
        ))
    }

    /// The ledger write committed but the cache update failed. Never
    /// surfaced to the caller; the reconciliation sweep repairs the cache.
    fn log_drift(&self, video: VideoId, err: &EngagementError) {
        let drift = EngagementError::PartialWriteDrift {
            video_id: video,
            detail: err.to_string(),
        };
        warn!(video_id = %video, %drift, "Counter cache out of sync with ledger");
    }

    async fn emit(&self, event: EngagementEvent) {
        if let Err(err) = self.publisher.publish(&event).await {
            warn!(
                error = ?err,
                kind = ?event.kind,
                video_id = %event.video_id,
                "Failed to publish engagement event"
            );
        }
    }
}
