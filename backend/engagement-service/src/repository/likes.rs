use crate::domain::models::Like;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for like rows
#[derive(Clone)]
pub struct LikeRepository {
    pool: PgPool,
}

impl LikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a like. The UNIQUE constraint on (user_id, video_id) makes the
    /// insert a no-op on duplicates, in which case no row is returned.
    pub async fn create_like(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Like>, sqlx::Error> {
        sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO video_likes (user_id, video_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, video_id) DO NOTHING
            RETURNING id, user_id, video_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a like. Returns whether a row was removed.
    pub async fn delete_like(&self, user_id: Uuid, video_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM video_likes
            WHERE user_id = $1 AND video_id = $2
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check if a user has liked a video
    pub async fn check_user_liked(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM video_likes
                WHERE user_id = $1 AND video_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Like count for a video (fallback when Redis is unavailable)
    pub async fn count_for_video(&self, video_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM video_likes
            WHERE video_id = $1
            "#,
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
    }
}
