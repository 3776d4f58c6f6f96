use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_schema::{ActorId, CommentId, VideoId};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CommentRepository, EngagementLedger, LikeRepository, ViewRepository};
use crate::domain::models::{Comment, Like, View};
use crate::error::EngagementResult;

/// PostgreSQL-backed engagement ledger composing the per-kind repositories.
#[derive(Clone)]
pub struct PgEngagementLedger {
    pool: PgPool,
    likes: LikeRepository,
    comments: CommentRepository,
    views: ViewRepository,
}

impl PgEngagementLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            likes: LikeRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            views: ViewRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl EngagementLedger for PgEngagementLedger {
    async fn insert_like(
        &self,
        actor: ActorId,
        video: VideoId,
    ) -> EngagementResult<Option<Like>> {
        Ok(self
            .likes
            .create_like(actor.as_uuid(), video.as_uuid())
            .await?)
    }

    async fn delete_like(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool> {
        Ok(self
            .likes
            .delete_like(actor.as_uuid(), video.as_uuid())
            .await?)
    }

    async fn has_like(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool> {
        Ok(self
            .likes
            .check_user_liked(actor.as_uuid(), video.as_uuid())
            .await?)
    }

    async fn count_likes(&self, video: VideoId) -> EngagementResult<i64> {
        Ok(self.likes.count_for_video(video.as_uuid()).await?)
    }

    async fn insert_comment(
        &self,
        actor: ActorId,
        video: VideoId,
        content: &str,
    ) -> EngagementResult<Comment> {
        Ok(self
            .comments
            .create_comment(video.as_uuid(), actor.as_uuid(), content)
            .await?)
    }

    async fn get_comment(&self, comment: CommentId) -> EngagementResult<Option<Comment>> {
        Ok(self.comments.get_comment(comment.as_uuid()).await?)
    }

    async fn soft_delete_comment(
        &self,
        comment: CommentId,
        author: ActorId,
    ) -> EngagementResult<Option<VideoId>> {
        let video_id = self
            .comments
            .delete_comment(comment.as_uuid(), author.as_uuid())
            .await?;
        Ok(video_id.map(VideoId::from))
    }

    async fn count_comments(&self, video: VideoId) -> EngagementResult<i64> {
        Ok(self.comments.count_for_video(video.as_uuid()).await?)
    }

    async fn insert_view(
        &self,
        video: VideoId,
        actor: Option<ActorId>,
    ) -> EngagementResult<View> {
        Ok(self
            .views
            .create_view(video.as_uuid(), actor.map(|a| a.as_uuid()))
            .await?)
    }

    async fn count_views(&self, video: VideoId) -> EngagementResult<i64> {
        Ok(self.views.count_for_video(video.as_uuid()).await?)
    }

    async fn videos_active_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> EngagementResult<Vec<VideoId>> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT video_id FROM video_likes WHERE created_at >= $1
            UNION
            SELECT video_id FROM video_comments WHERE updated_at >= $1
            UNION
            SELECT video_id FROM video_views WHERE created_at >= $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(VideoId::from).collect())
    }
}
