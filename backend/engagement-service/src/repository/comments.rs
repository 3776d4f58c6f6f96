use crate::domain::models::Comment;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for comment rows
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new comment
    pub async fn create_comment(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO video_comments (video_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, video_id, user_id, content, is_deleted, created_at, updated_at
            "#,
        )
        .bind(video_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a single live comment by ID
    pub async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, video_id, user_id, content, is_deleted, created_at, updated_at
            FROM video_comments
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Soft-delete a comment, constrained to its author.
    /// Returns the video id of the deleted comment.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE video_comments
            SET is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE
            RETURNING video_id
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Live comment count for a video (fallback when Redis is unavailable)
    pub async fn count_for_video(&self, video_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM video_comments
            WHERE video_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
    }
}
