use async_trait::async_trait;
use event_schema::{ActorId, VideoId};
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::VideoCounters;
use crate::error::EngagementResult;

/// Outcome of an atomic membership-plus-counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipUpdate {
    /// Membership changed; `count` is the counter value after the update.
    Applied { count: i64 },
    /// Membership was already in the requested state; nothing was counted.
    Unchanged,
}

/// Fast counter and membership store.
///
/// Every per-video mutation is a single atomic round-trip - the membership
/// set-add is the arbiter of "first writer wins" for concurrent likes from
/// the same actor, and counters never race a read-modify-write cycle.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `actor` to the video's liker set and bump the like
    /// counter. Returns `Unchanged` when the actor was already a member.
    async fn like_added(&self, video: VideoId, actor: ActorId)
        -> EngagementResult<MembershipUpdate>;

    /// Atomically remove `actor` from the liker set and decrement the like
    /// counter, floored at zero. Returns `Unchanged` for non-members.
    async fn like_removed(
        &self,
        video: VideoId,
        actor: ActorId,
    ) -> EngagementResult<MembershipUpdate>;

    /// Plain set-add without touching the counter (membership repair).
    async fn add_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool>;

    /// Plain set-remove without touching the counter (membership repair).
    async fn remove_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool>;

    /// "Has actor X liked video Y"
    async fn is_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool>;

    /// "Who liked video Y"
    async fn members(&self, video: VideoId) -> EngagementResult<Vec<ActorId>>;

    async fn incr_comments(&self, video: VideoId) -> EngagementResult<i64>;

    /// Decrement the comment counter, floored at zero.
    async fn decr_comments(&self, video: VideoId) -> EngagementResult<i64>;

    async fn incr_views(&self, video: VideoId) -> EngagementResult<i64>;

    /// All counters for a video; `None` on a cache miss.
    async fn get_counters(&self, video: VideoId) -> EngagementResult<Option<VideoCounters>>;

    /// Batch counter read, one round-trip for all videos.
    async fn batch_get_counters(
        &self,
        videos: &[VideoId],
    ) -> EngagementResult<HashMap<VideoId, Option<VideoCounters>>>;

    /// Overwrite a video's counters (cache warm and reconciliation sweep).
    async fn put_counters(&self, video: VideoId, counters: VideoCounters)
        -> EngagementResult<()>;

    async fn ping(&self) -> EngagementResult<()>;
}

/// Redis-backed counter store.
///
/// Keys: video:{video_id}:likes|comments|views (counters),
///       video:{video_id}:likers (membership set).
/// TTL: 7 days, refreshed on writes; expired videos are re-warmed from the
/// ledger on the next read.
#[derive(Clone)]
pub struct RedisCounterStore {
    redis: ConnectionManager,
    like_added: Arc<Script>,
    like_removed: Arc<Script>,
    floor_decr: Arc<Script>,
}

/// Counter key TTL (7 days) - for set_ex (u64)
const COUNTER_TTL_U64: u64 = 604800;
/// Counter key TTL (7 days) - for expire (i64)
const COUNTER_TTL_I64: i64 = 604800;

// SADD is the arbiter: the counter only moves when membership actually
// changed, and both happen inside one script execution.
const LIKE_ADDED_LUA: &str = r#"
if redis.call('SADD', KEYS[1], ARGV[1]) == 1 then
    local count = redis.call('INCR', KEYS[2])
    redis.call('EXPIRE', KEYS[1], ARGV[2])
    redis.call('EXPIRE', KEYS[2], ARGV[2])
    return count
end
return -1
"#;

const LIKE_REMOVED_LUA: &str = r#"
if redis.call('SREM', KEYS[1], ARGV[1]) == 1 then
    local count = redis.call('DECR', KEYS[2])
    if count < 0 then
        redis.call('SET', KEYS[2], 0)
        count = 0
    end
    return count
end
return -1
"#;

const FLOOR_DECR_LUA: &str = r#"
local count = redis.call('DECR', KEYS[1])
if count < 0 then
    redis.call('SET', KEYS[1], 0)
    count = 0
end
return count
"#;

fn likes_key(video: VideoId) -> String {
    format!("video:{}:likes", video)
}

fn comments_key(video: VideoId) -> String {
    format!("video:{}:comments", video)
}

fn views_key(video: VideoId) -> String {
    format!("video:{}:views", video)
}

fn likers_key(video: VideoId) -> String {
    format!("video:{}:likers", video)
}

impl RedisCounterStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            like_added: Arc::new(Script::new(LIKE_ADDED_LUA)),
            like_removed: Arc::new(Script::new(LIKE_REMOVED_LUA)),
            floor_decr: Arc::new(Script::new(FLOOR_DECR_LUA)),
        }
    }

    async fn incr_with_ttl(&self, key: &str) -> EngagementResult<i64> {
        let new_count: i64 = self.redis.clone().incr(key, 1).await?;

        // Set TTL on first increment
        if new_count == 1 {
            let _: () = self.redis.clone().expire(key, COUNTER_TTL_I64).await?;
        }

        Ok(new_count)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn like_added(
        &self,
        video: VideoId,
        actor: ActorId,
    ) -> EngagementResult<MembershipUpdate> {
        let count: i64 = self
            .like_added
            .key(likers_key(video))
            .key(likes_key(video))
            .arg(actor.to_string())
            .arg(COUNTER_TTL_I64)
            .invoke_async(&mut self.redis.clone())
            .await?;

        if count < 0 {
            Ok(MembershipUpdate::Unchanged)
        } else {
            Ok(MembershipUpdate::Applied { count })
        }
    }

    async fn like_removed(
        &self,
        video: VideoId,
        actor: ActorId,
    ) -> EngagementResult<MembershipUpdate> {
        let count: i64 = self
            .like_removed
            .key(likers_key(video))
            .key(likes_key(video))
            .arg(actor.to_string())
            .invoke_async(&mut self.redis.clone())
            .await?;

        if count < 0 {
            Ok(MembershipUpdate::Unchanged)
        } else {
            Ok(MembershipUpdate::Applied { count })
        }
    }

    async fn add_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool> {
        let added: i64 = self
            .redis
            .clone()
            .sadd(likers_key(video), actor.to_string())
            .await?;
        Ok(added == 1)
    }

    async fn remove_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool> {
        let removed: i64 = self
            .redis
            .clone()
            .srem(likers_key(video), actor.to_string())
            .await?;
        Ok(removed == 1)
    }

    async fn is_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool> {
        let member: bool = self
            .redis
            .clone()
            .sismember(likers_key(video), actor.to_string())
            .await?;
        Ok(member)
    }

    async fn members(&self, video: VideoId) -> EngagementResult<Vec<ActorId>> {
        let raw: Vec<String> = self.redis.clone().smembers(likers_key(video)).await?;
        Ok(raw
            .iter()
            .filter_map(|s| Uuid::parse_str(s).ok())
            .map(ActorId::from)
            .collect())
    }

    async fn incr_comments(&self, video: VideoId) -> EngagementResult<i64> {
        self.incr_with_ttl(&comments_key(video)).await
    }

    async fn decr_comments(&self, video: VideoId) -> EngagementResult<i64> {
        let count: i64 = self
            .floor_decr
            .key(comments_key(video))
            .invoke_async(&mut self.redis.clone())
            .await?;
        Ok(count)
    }

    async fn incr_views(&self, video: VideoId) -> EngagementResult<i64> {
        self.incr_with_ttl(&views_key(video)).await
    }

    async fn get_counters(&self, video: VideoId) -> EngagementResult<Option<VideoCounters>> {
        let keys = [likes_key(video), comments_key(video), views_key(video)];
        let values: Vec<Option<i64>> = self.redis.clone().get(&keys[..]).await?;

        // A partially-expired trio under-reports; treat it as a miss so the
        // caller re-warms all three from the ledger.
        match (values.first(), values.get(1), values.get(2)) {
            (Some(Some(likes)), Some(Some(comments)), Some(Some(views))) => {
                Ok(Some(VideoCounters::new(*likes, *comments, *views)))
            }
            _ => Ok(None),
        }
    }

    async fn batch_get_counters(
        &self,
        videos: &[VideoId],
    ) -> EngagementResult<HashMap<VideoId, Option<VideoCounters>>> {
        if videos.is_empty() {
            return Ok(HashMap::new());
        }

        // Keys for MGET: [likes1, comments1, views1, likes2, ...]
        let mut keys = Vec::with_capacity(videos.len() * 3);
        for video in videos {
            keys.push(likes_key(*video));
            keys.push(comments_key(*video));
            keys.push(views_key(*video));
        }

        let values: Vec<Option<i64>> = self.redis.clone().get(&keys).await?;

        let mut result = HashMap::with_capacity(videos.len());
        for (i, video) in videos.iter().enumerate() {
            let counters = match (
                values.get(i * 3).copied().flatten(),
                values.get(i * 3 + 1).copied().flatten(),
                values.get(i * 3 + 2).copied().flatten(),
            ) {
                (Some(likes), Some(comments), Some(views)) => {
                    Some(VideoCounters::new(likes, comments, views))
                }
                _ => None,
            };
            result.insert(*video, counters);
        }

        Ok(result)
    }

    async fn put_counters(
        &self,
        video: VideoId,
        counters: VideoCounters,
    ) -> EngagementResult<()> {
        let mut pipe = redis::pipe();
        pipe.set_ex(likes_key(video), counters.likes, COUNTER_TTL_U64)
            .ignore();
        pipe.set_ex(comments_key(video), counters.comments, COUNTER_TTL_U64)
            .ignore();
        pipe.set_ex(views_key(video), counters.views, COUNTER_TTL_U64)
            .ignore();

        pipe.query_async::<_, ()>(&mut self.redis.clone()).await?;
        Ok(())
    }

    async fn ping(&self) -> EngagementResult<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.redis.clone())
            .await?;
        Ok(())
    }
}
