#![allow(dead_code)]

//! In-memory implementations of the engine's collaborator seams, used to
//! exercise the orchestration logic without Postgres/Redis/Kafka.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engagement_service::domain::models::{Comment, Like, VideoCounters, View};
use engagement_service::error::{EngagementError, EngagementResult};
use engagement_service::repository::EngagementLedger;
use engagement_service::services::counters::{CounterStore, MembershipUpdate};
use engagement_service::services::events::EngagementPublisher;
use engagement_service::services::EngagementService;
use event_schema::{ActorId, CommentId, EngagementEvent, EngagementKind, VideoId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Ledger fake
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryLedger {
    likes: Mutex<Vec<Like>>,
    comments: Mutex<Vec<Comment>>,
    views: Mutex<Vec<View>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn like_rows(&self) -> usize {
        self.likes.lock().unwrap().len()
    }

    pub fn live_comment_rows(&self, video: VideoId) -> usize {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.video_id == video.as_uuid() && !c.is_deleted)
            .count()
    }
}

#[async_trait]
impl EngagementLedger for MemoryLedger {
    async fn insert_like(
        &self,
        actor: ActorId,
        video: VideoId,
    ) -> EngagementResult<Option<Like>> {
        let mut likes = self.likes.lock().unwrap();
        if likes
            .iter()
            .any(|l| l.user_id == actor.as_uuid() && l.video_id == video.as_uuid())
        {
            return Ok(None);
        }
        let like = Like {
            id: Uuid::new_v4(),
            user_id: actor.as_uuid(),
            video_id: video.as_uuid(),
            created_at: Utc::now(),
        };
        likes.push(like.clone());
        Ok(Some(like))
    }

    async fn delete_like(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool> {
        let mut likes = self.likes.lock().unwrap();
        let before = likes.len();
        likes.retain(|l| !(l.user_id == actor.as_uuid() && l.video_id == video.as_uuid()));
        Ok(likes.len() < before)
    }

    async fn has_like(&self, actor: ActorId, video: VideoId) -> EngagementResult<bool> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.user_id == actor.as_uuid() && l.video_id == video.as_uuid()))
    }

    async fn count_likes(&self, video: VideoId) -> EngagementResult<i64> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.video_id == video.as_uuid())
            .count() as i64)
    }

    async fn insert_comment(
        &self,
        actor: ActorId,
        video: VideoId,
        content: &str,
    ) -> EngagementResult<Comment> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            video_id: video.as_uuid(),
            user_id: actor.as_uuid(),
            content: content.to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, comment: CommentId) -> EngagementResult<Option<Comment>> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == comment.as_uuid() && !c.is_deleted)
            .cloned())
    }

    async fn soft_delete_comment(
        &self,
        comment: CommentId,
        author: ActorId,
    ) -> EngagementResult<Option<VideoId>> {
        let mut comments = self.comments.lock().unwrap();
        for c in comments.iter_mut() {
            if c.id == comment.as_uuid() && c.user_id == author.as_uuid() && !c.is_deleted {
                c.is_deleted = true;
                c.updated_at = Utc::now();
                return Ok(Some(VideoId::from(c.video_id)));
            }
        }
        Ok(None)
    }

    async fn count_comments(&self, video: VideoId) -> EngagementResult<i64> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.video_id == video.as_uuid() && !c.is_deleted)
            .count() as i64)
    }

    async fn insert_view(
        &self,
        video: VideoId,
        actor: Option<ActorId>,
    ) -> EngagementResult<View> {
        let view = View {
            id: Uuid::new_v4(),
            video_id: video.as_uuid(),
            user_id: actor.map(|a| a.as_uuid()),
            created_at: Utc::now(),
        };
        self.views.lock().unwrap().push(view.clone());
        Ok(view)
    }

    async fn count_views(&self, video: VideoId) -> EngagementResult<i64> {
        Ok(self
            .views
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.video_id == video.as_uuid())
            .count() as i64)
    }

    async fn videos_active_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> EngagementResult<Vec<VideoId>> {
        let mut active: HashSet<Uuid> = HashSet::new();
        for like in self.likes.lock().unwrap().iter() {
            if like.created_at >= cutoff {
                active.insert(like.video_id);
            }
        }
        for comment in self.comments.lock().unwrap().iter() {
            if comment.updated_at >= cutoff {
                active.insert(comment.video_id);
            }
        }
        for view in self.views.lock().unwrap().iter() {
            if view.created_at >= cutoff {
                active.insert(view.video_id);
            }
        }
        Ok(active.into_iter().map(VideoId::from).collect())
    }
}

// ---------------------------------------------------------------------------
// Counter store fake
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
struct Cell {
    likes: i64,
    comments: i64,
    views: i64,
    members: HashSet<ActorId>,
}

/// Mutex-guarded map; every operation holds the lock for its whole body, so
/// the fake gives the same single-round-trip atomicity the Lua scripts do.
#[derive(Default)]
pub struct MemoryCounterStore {
    inner: Mutex<HashMap<VideoId, Cell>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Directly seed cached counters (simulating drift for sweep tests).
    pub fn seed(&self, video: VideoId, counters: VideoCounters) {
        let mut inner = self.inner.lock().unwrap();
        let cell = inner.entry(video).or_default();
        cell.likes = counters.likes;
        cell.comments = counters.comments;
        cell.views = counters.views;
    }

    fn write_guard(&self) -> EngagementResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngagementError::Internal(
                "simulated cache outage".to_string(),
            ));
        }
        Ok(())
    }

    fn read_guard(&self) -> EngagementResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(EngagementError::Internal(
                "simulated cache outage".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn like_added(
        &self,
        video: VideoId,
        actor: ActorId,
    ) -> EngagementResult<MembershipUpdate> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let cell = inner.entry(video).or_default();
        if cell.members.insert(actor) {
            cell.likes += 1;
            Ok(MembershipUpdate::Applied { count: cell.likes })
        } else {
            Ok(MembershipUpdate::Unchanged)
        }
    }

    async fn like_removed(
        &self,
        video: VideoId,
        actor: ActorId,
    ) -> EngagementResult<MembershipUpdate> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let cell = inner.entry(video).or_default();
        if cell.members.remove(&actor) {
            cell.likes = (cell.likes - 1).max(0);
            Ok(MembershipUpdate::Applied { count: cell.likes })
        } else {
            Ok(MembershipUpdate::Unchanged)
        }
    }

    async fn add_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.entry(video).or_default().members.insert(actor))
    }

    async fn remove_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.entry(video).or_default().members.remove(&actor))
    }

    async fn is_member(&self, video: VideoId, actor: ActorId) -> EngagementResult<bool> {
        self.read_guard()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .get(&video)
            .map(|cell| cell.members.contains(&actor))
            .unwrap_or(false))
    }

    async fn members(&self, video: VideoId) -> EngagementResult<Vec<ActorId>> {
        self.read_guard()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .get(&video)
            .map(|cell| cell.members.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn incr_comments(&self, video: VideoId) -> EngagementResult<i64> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let cell = inner.entry(video).or_default();
        cell.comments += 1;
        Ok(cell.comments)
    }

    async fn decr_comments(&self, video: VideoId) -> EngagementResult<i64> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let cell = inner.entry(video).or_default();
        cell.comments = (cell.comments - 1).max(0);
        Ok(cell.comments)
    }

    async fn incr_views(&self, video: VideoId) -> EngagementResult<i64> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let cell = inner.entry(video).or_default();
        cell.views += 1;
        Ok(cell.views)
    }

    async fn get_counters(&self, video: VideoId) -> EngagementResult<Option<VideoCounters>> {
        self.read_guard()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .get(&video)
            .map(|cell| VideoCounters::new(cell.likes, cell.comments, cell.views)))
    }

    async fn batch_get_counters(
        &self,
        videos: &[VideoId],
    ) -> EngagementResult<HashMap<VideoId, Option<VideoCounters>>> {
        self.read_guard()?;
        let inner = self.inner.lock().unwrap();
        Ok(videos
            .iter()
            .map(|video| {
                (
                    *video,
                    inner
                        .get(video)
                        .map(|cell| VideoCounters::new(cell.likes, cell.comments, cell.views)),
                )
            })
            .collect())
    }

    async fn put_counters(
        &self,
        video: VideoId,
        counters: VideoCounters,
    ) -> EngagementResult<()> {
        self.write_guard()?;
        self.seed(video, counters);
        Ok(())
    }

    async fn ping(&self) -> EngagementResult<()> {
        self.read_guard()
    }
}

// ---------------------------------------------------------------------------
// Publisher fake
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CapturingPublisher {
    events: Mutex<Vec<EngagementEvent>>,
}

impl CapturingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngagementEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EngagementKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl EngagementPublisher for CapturingPublisher {
    async fn publish(&self, event: &EngagementEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub ledger: Arc<MemoryLedger>,
    pub counters: Arc<MemoryCounterStore>,
    pub published: Arc<CapturingPublisher>,
    pub engine: EngagementService,
}

impl Harness {
    pub fn new() -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let counters = Arc::new(MemoryCounterStore::new());
        let published = Arc::new(CapturingPublisher::new());
        let engine = EngagementService::new(
            ledger.clone(),
            counters.clone(),
            published.clone(),
        );
        Self {
            ledger,
            counters,
            published,
            engine,
        }
    }
}

pub fn actor() -> ActorId {
    ActorId::new(Uuid::new_v4())
}

pub fn video() -> VideoId {
    VideoId::new(Uuid::new_v4())
}
