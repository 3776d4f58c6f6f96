use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_schema::{ActorId, CommentId, VideoId};

use crate::domain::models::{Comment, Like, View};
use crate::error::EngagementResult;

mod comments;
mod ledger;
mod likes;
mod views;

pub use comments::CommentRepository;
pub use ledger::PgEngagementLedger;
pub use likes::LikeRepository;
pub use views::ViewRepository;

/// The durable ledger of individual engagement actions.
///
/// Source of truth for record existence and ownership; aggregate counts are
/// served from the counter cache and only recomputed here for fallbacks and
/// the reconciliation sweep.
#[async_trait]
pub trait EngagementLedger: Send + Sync {
    /// Insert a like row. Returns `None` when the `(actor, video)` pair
    /// already exists - the ledger-side backstop against duplicate likes.
    async fn insert_like(&self, actor: ActorId, video: VideoId)
        -> EngagementResult<Option<Like>>;

    /// Delete a like row. Returns whether a row was actually removed.
    async fn delete_like(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool>;

    async fn has_like(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool>;

    async fn count_likes(&self, video: VideoId) -> EngagementResult<i64>;

    async fn insert_comment(
        &self,
        actor: ActorId,
        video: VideoId,
        content: &str,
    ) -> EngagementResult<Comment>;

    async fn get_comment(&self, comment: CommentId) -> EngagementResult<Option<Comment>>;

    /// Soft-delete a comment owned by `author`. Returns the video id of the
    /// deleted comment, or `None` when no live row matched.
    async fn soft_delete_comment(
        &self,
        comment: CommentId,
        author: ActorId,
    ) -> EngagementResult<Option<VideoId>>;

    async fn count_comments(&self, video: VideoId) -> EngagementResult<i64>;

    async fn insert_view(&self, video: VideoId, actor: Option<ActorId>)
        -> EngagementResult<View>;

    async fn count_views(&self, video: VideoId) -> EngagementResult<i64>;

    /// Videos with any engagement activity since `cutoff`, for the
    /// reconciliation sweep.
    async fn videos_active_since(&self, cutoff: DateTime<Utc>)
        -> EngagementResult<Vec<VideoId>>;
}
