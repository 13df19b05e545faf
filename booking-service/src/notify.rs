use anyhow::Result;
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use shared::BookingEvent;
use std::time::Duration;
use tracing::warn;

/// Outbound notification seam. Implementations deliver booking events to
/// whoever fans them out to customers and restaurant staff; the engine
/// only ever calls this through [`best_effort`].
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &BookingEvent) -> Result<()>;
}

/// Publishes booking events as JSON to a Kafka topic, keyed by booking id.
pub struct KafkaNotificationSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaNotificationSink {
    pub fn new(producer: FutureProducer, topic: String) -> Self {
        Self { producer, topic }
    }
}

#[async_trait]
impl NotificationSink for KafkaNotificationSink {
    async fn notify(&self, event: &BookingEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        let key = event.booking_id.to_string();
        let record = FutureRecord::to(&self.topic).payload(&json).key(&key);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("failed to publish booking event: {}", e))?;

        Ok(())
    }
}

/// Runs strictly after the surrounding transaction has committed. A
/// delivery failure is logged and swallowed; it must never undo or fail
/// the booking mutation it announces.
pub async fn best_effort(sink: &dyn NotificationSink, event: BookingEvent) {
    if let Err(e) = sink.notify(&event).await {
        warn!(
            "failed to deliver {:?} notification for booking {}: {:#}",
            event.kind, event.booking_id, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::BookingEventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    pub(crate) struct RecordingSink {
        pub events: Mutex<Vec<BookingEvent>>,
    }

    impl RecordingSink {
        pub(crate) fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: &BookingEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _event: &BookingEvent) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("broker unreachable"))
        }
    }

    fn event(kind: BookingEventKind) -> BookingEvent {
        BookingEvent {
            booking_id: 1,
            customer_id: Uuid::new_v4(),
            restaurant_id: 1,
            kind,
            booking_time: Utc::now(),
            guest_count: 2,
            cancel_reason: None,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivery_failures_are_swallowed() {
        let sink = FailingSink {
            attempts: AtomicUsize::new(0),
        };
        // Must not panic or propagate; the caller has already committed.
        best_effort(&sink, event(BookingEventKind::Created)).await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_delivery_passes_the_event_through() {
        let sink = RecordingSink::new();
        best_effort(&sink, event(BookingEventKind::Confirmed)).await;

        let seen = sink.events.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, BookingEventKind::Confirmed);
    }
}
