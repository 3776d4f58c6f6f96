/// Error types for the engagement service
use event_schema::VideoId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngagementError {
    /// The actor already holds a like on this video
    #[error("already engaged")]
    AlreadyEngaged,

    /// The actor holds no like on this video
    #[error("not engaged")]
    NotEngaged,

    /// Only the author may modify this record
    #[error("forbidden")]
    Forbidden,

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Internal-only: a cache update failed after the ledger write committed.
    /// Logged for the reconciliation sweep, never returned to callers.
    #[error("partial write drift on video {video_id}: {detail}")]
    PartialWriteDrift { video_id: VideoId, detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngagementError {
    /// Whether the caller may safely retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngagementError::Database(_) | EngagementError::Redis(_)
        )
    }

    /// Whether the error is the caller's to correct (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngagementError::AlreadyEngaged
                | EngagementError::NotEngaged
                | EngagementError::Forbidden
                | EngagementError::InvalidContent(_)
                | EngagementError::NotFound(_)
        )
    }
}

/// Result type alias for engagement operations
pub type EngagementResult<T> = Result<T, EngagementError>;
