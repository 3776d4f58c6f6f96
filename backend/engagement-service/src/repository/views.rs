use crate::domain::models::View;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for view rows. Views are never deduplicated, so the table is
/// append-only.
#[derive(Clone)]
pub struct ViewRepository {
    pool: PgPool,
}

impl ViewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a view. `user_id` is absent for anonymous playback.
    pub async fn create_view(
        &self,
        video_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<View, sqlx::Error> {
        sqlx::query_as::<_, View>(
            r#"
            INSERT INTO video_views (video_id, user_id)
            VALUES ($1, $2)
            RETURNING id, video_id, user_id, created_at
            "#,
        )
        .bind(video_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    /// View count for a video (fallback when Redis is unavailable)
    pub async fn count_for_video(&self, video_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM video_views
            WHERE video_id = $1
            "#,
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
    }
}
