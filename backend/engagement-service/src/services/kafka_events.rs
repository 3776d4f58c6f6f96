//! Kafka event producer for the engagement pipeline
//!
//! Publishes like/unlike/comment/view events for downstream consumers
//! (notifications, analytics, feed ranking). Delivery is at-least-once with
//! bounded retry; after the retries are exhausted the event is logged and
//! dropped - the ledger write already committed, so event loss only delays
//! downstream freshness.

use anyhow::Result;
use async_trait::async_trait;
use event_schema::{EngagementEvent, EventEnvelope};
use rdkafka::message::OwnedHeaders;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tracing::{info, warn};

use super::events::EngagementPublisher;
use crate::metrics::PublisherMetrics;

/// Delivery attempts before an event is dropped
const PUBLISH_ATTEMPTS: u32 = 3;
/// Base delay for exponential backoff between attempts
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Configuration for the Kafka event producer
#[derive(Debug, Clone)]
pub struct KafkaEventProducerConfig {
    pub brokers: String,
    pub topic: String,
}

impl KafkaEventProducerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Option<Self> {
        let brokers = std::env::var("KAFKA_BROKERS").ok()?;

        if brokers.trim().is_empty() {
            return None;
        }

        let topic_prefix =
            std::env::var("KAFKA_TOPIC_PREFIX").unwrap_or_else(|_| "clipstream".to_string());

        Some(Self {
            brokers,
            topic: std::env::var("KAFKA_ENGAGEMENT_EVENTS_TOPIC")
                .unwrap_or_else(|_| format!("{}.engagement.events", topic_prefix)),
        })
    }
}

/// Kafka producer for engagement events
#[derive(Clone)]
pub struct KafkaEngagementProducer {
    producer: FutureProducer,
    topic: String,
    metrics: PublisherMetrics,
}

impl KafkaEngagementProducer {
    /// Create a new Kafka event producer
    pub fn new(config: &KafkaEventProducerConfig) -> Result<Self> {
        let producer = rdkafka::config::ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", "engagement-service")
            // Idempotency and reliability settings
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retries", "3")
            .set("linger.ms", "5")
            .create::<FutureProducer>()?;

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            "Engagement Kafka producer initialized"
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            metrics: PublisherMetrics::new("engagement-service"),
        })
    }
}

#[async_trait]
impl EngagementPublisher for KafkaEngagementProducer {
    async fn publish(&self, event: &EngagementEvent) -> Result<()> {
        let envelope = EventEnvelope::new(
            "engagement-service",
            event.kind.event_type(),
            event.clone(),
        );
        let payload = serde_json::to_string(&envelope)?;
        // Partition by video id so per-video ordering survives the bus
        let partition_key = event.partition_key();

        for attempt in 1..=PUBLISH_ATTEMPTS {
            let headers = OwnedHeaders::new().insert(rdkafka::message::Header {
                key: "event_type",
                value: Some(envelope.event_type.as_str()),
            });

            let record = FutureRecord::to(&self.topic)
                .key(&partition_key)
                .payload(&payload)
                .headers(headers);

            match self.producer.send(record, Duration::from_secs(5)).await {
                Ok(_) => {
                    self.metrics.published.inc();
                    info!(
                        event_type = %envelope.event_type,
                        partition_key = %partition_key,
                        "Published engagement event to Kafka"
                    );
                    return Ok(());
                }
                Err((err, _)) => {
                    warn!(
                        error = ?err,
                        event_type = %envelope.event_type,
                        attempt,
                        "Failed to publish engagement event to Kafka"
                    );
                    if attempt < PUBLISH_ATTEMPTS {
                        tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
                    }
                }
            }
        }

        self.metrics.dropped.inc();
        warn!(
            event_type = %envelope.event_type,
            video_id = %event.video_id,
            "Dropping engagement event after exhausting retries"
        );
        Ok(())
    }
}
