use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Like entity - one row per (user, video) pair in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Comment entity - immutable once created except for soft deletion
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// View entity - anonymous views carry no user id
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct View {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate engagement counters for one video.
///
/// Derived from the ledger, cached for fast reads. Values are never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCounters {
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
}

impl VideoCounters {
    pub fn new(likes: i64, comments: i64, views: i64) -> Self {
        Self {
            likes,
            comments,
            views,
        }
    }

    /// Whether any counter diverges from `other` by more than `tolerance`.
    pub fn diverges_from(&self, other: &VideoCounters, tolerance: i64) -> bool {
        (self.likes - other.likes).abs() > tolerance
            || (self.comments - other.comments).abs() > tolerance
            || (self.views - other.views).abs() > tolerance
    }
}

/// Result of a successful like or unlike call
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub likes: i64,
}

/// Result of a successful comment creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentOutcome {
    pub comment: Comment,
    pub comments: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divergence_within_tolerance() {
        let truth = VideoCounters::new(10, 5, 100);
        let cached = VideoCounters::new(11, 5, 100);

        assert!(cached.diverges_from(&truth, 0));
        assert!(!cached.diverges_from(&truth, 1));
    }

    #[test]
    fn test_divergence_checks_all_counters() {
        let truth = VideoCounters::new(10, 5, 100);
        let cached = VideoCounters::new(10, 5, 97);

        assert!(cached.diverges_from(&truth, 2));
    }
}
