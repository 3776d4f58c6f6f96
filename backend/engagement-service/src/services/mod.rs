pub mod counters;
pub mod engagement;
pub mod events;
pub mod kafka_events;

pub use counters::{CounterStore, MembershipUpdate, RedisCounterStore};
pub use engagement::EngagementService;
pub use events::{CompositePublisher, EngagementPublisher, NoopPublisher};
pub use kafka_events::{KafkaEngagementProducer, KafkaEventProducerConfig};
