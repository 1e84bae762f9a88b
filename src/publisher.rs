//! Domain event publishing.
//!
//! Events are fire-and-forget: a failed publish is logged and never fails the
//! cart or checkout operation that raised it.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Publishes JSON-encoded events to NATS under [`DomainEvent::subject`].
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(subject, error = %e, "event serialization failed");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "event publish failed");
        }
    }
}

/// Used when no message broker is configured.
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: DomainEvent) {
        tracing::debug!(subject = event.subject(), ?event, "domain event");
    }
}

/// Keeps published events in memory.
#[derive(Default)]
pub struct MemoryPublisher {
    events: RwLock<Vec<DomainEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subjects(&self) -> Vec<&'static str> {
        self.events.read().await.iter().map(DomainEvent::subject).collect()
    }

    pub async fn take(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.write().await)
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, event: DomainEvent) {
        self.events.write().await.push(event);
    }
}
