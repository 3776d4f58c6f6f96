//! End-to-end scenario: engine calls flow through the composite publisher
//! into both the event bus capture and a live room, and a subscriber sees
//! one broadcast per state-changing call (views are not broadcast).

mod support;

use engagement_service::gateway::{ConnectionId, RoomBroadcaster, RoomRegistry, WsServerMessage};
use engagement_service::services::{CompositePublisher, EngagementPublisher, EngagementService};
use event_schema::EngagementKind;
use std::sync::Arc;
use support::{actor, video, CapturingPublisher, MemoryCounterStore, MemoryLedger};
use tokio::sync::mpsc;

#[tokio::test]
async fn scenario_counts_and_room_broadcasts() {
    let ledger = Arc::new(MemoryLedger::new());
    let counters = Arc::new(MemoryCounterStore::new());
    let captured = Arc::new(CapturingPublisher::new());

    let registry = RoomRegistry::new();
    let sinks: Vec<Arc<dyn EngagementPublisher>> = vec![
        captured.clone(),
        Arc::new(RoomBroadcaster::new(registry.clone())),
    ];
    let engine = EngagementService::new(
        ledger.clone(),
        counters.clone(),
        Arc::new(CompositePublisher::new(sinks)),
    );

    let v1 = video();
    let (u1, u2) = (actor(), actor());

    // a viewer joins v1's room
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.subscribe(v1, ConnectionId::new(), tx);

    // u1 likes, u2 likes, u1 comments, u1 unlikes, three anonymous views
    assert_eq!(engine.like(u1, v1).await.unwrap().likes, 1);
    assert_eq!(engine.like(u2, v1).await.unwrap().likes, 2);

    let comment = engine.add_comment(u1, v1, "nice!").await.unwrap();
    assert_eq!(comment.comments, 1);

    assert_eq!(engine.unlike(u1, v1).await.unwrap().likes, 1);

    for _ in 0..3 {
        engine.record_view(v1, None).await.unwrap();
    }

    let final_counters = engine.counters(v1).await.unwrap();
    assert_eq!(final_counters.likes, 1);
    assert_eq!(final_counters.comments, 1);
    assert_eq!(final_counters.views, 3);

    // the bus capture saw every event, views included
    assert_eq!(
        captured.kinds(),
        vec![
            EngagementKind::Liked,
            EngagementKind::Liked,
            EngagementKind::Commented,
            EngagementKind::Unliked,
            EngagementKind::Viewed,
            EngagementKind::Viewed,
            EngagementKind::Viewed,
        ]
    );

    // the room saw exactly the four state-changing broadcasts
    let mut broadcasts = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        let message: WsServerMessage = serde_json::from_str(&payload).unwrap();
        broadcasts.push(message);
    }

    let kinds: Vec<EngagementKind> = broadcasts
        .iter()
        .map(|m| match m {
            WsServerMessage::Engagement { kind, .. } => *kind,
            other => panic!("unexpected room message: {:?}", other),
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            EngagementKind::Liked,
            EngagementKind::Liked,
            EngagementKind::Commented,
            EngagementKind::Unliked,
        ]
    );

    // each broadcast carried the fresh aggregate for its kind
    let counts: Vec<i64> = broadcasts
        .iter()
        .map(|m| match m {
            WsServerMessage::Engagement {
                resulting_count, ..
            } => *resulting_count,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(counts, vec![1, 2, 1, 1]);
}

#[tokio::test]
async fn broadcast_failure_never_fails_the_engagement_call() {
    let ledger = Arc::new(MemoryLedger::new());
    let counters = Arc::new(MemoryCounterStore::new());

    let registry = RoomRegistry::new();
    let sinks: Vec<Arc<dyn EngagementPublisher>> =
        vec![Arc::new(RoomBroadcaster::new(registry.clone()))];
    let engine = EngagementService::new(
        ledger,
        counters,
        Arc::new(CompositePublisher::new(sinks)),
    );

    let v = video();
    let (tx, rx) = mpsc::unbounded_channel();
    registry.subscribe(v, ConnectionId::new(), tx);
    // the subscriber is gone before the broadcast happens
    drop(rx);

    let outcome = engine.like(actor(), v).await.unwrap();
    assert_eq!(outcome.likes, 1);

    // the dead handle was pruned and its room garbage-collected
    assert_eq!(registry.room_size(v), 0);
}
