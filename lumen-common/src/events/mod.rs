//! Event types for the Lumen event system
//!
//! Provides shared event definitions and the EventBus used to fan
//! tracker lifecycle changes out to any number of listeners.

mod job_types;

pub use job_types::{CompletionReason, JobStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lumen event types
///
/// Events are broadcast via EventBus and serialize to tagged JSON, so a
/// transport layer can forward them unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LumenEvent {
    /// Tracker armed for a new embedding job
    EmbeddingStarted {
        job_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Estimated progress advanced after a poll without a completion signal
    EmbeddingProgress {
        job_id: String,
        /// Estimated percentage, 0-100
        progress: f64,
        timestamp: DateTime<Utc>,
    },

    /// Job reached the Completed state
    EmbeddingCompleted {
        job_id: String,
        reason: CompletionReason,
        timestamp: DateTime<Utc>,
    },

    /// Job reached the Failed state
    EmbeddingFailed {
        job_id: String,
        /// Progress at the time of failure (not reset)
        progress: f64,
        timestamp: DateTime<Utc>,
    },
}

impl LumenEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            LumenEvent::EmbeddingStarted { .. } => "EmbeddingStarted",
            LumenEvent::EmbeddingProgress { .. } => "EmbeddingProgress",
            LumenEvent::EmbeddingCompleted { .. } => "EmbeddingCompleted",
            LumenEvent::EmbeddingFailed { .. } => "EmbeddingFailed",
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use lumen_common::events::{EventBus, LumenEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(LumenEvent::EmbeddingStarted {
///     job_id: "doc-42".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LumenEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LumenEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LumenEvent,
    ) -> Result<usize, broadcast::error::SendError<LumenEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LumenEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(job_id: &str) -> LumenEvent {
        LumenEvent::EmbeddingStarted {
            job_id: job_id.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("a")).is_err());
        // Lossy variant must not panic either
        bus.emit_lossy(started("a"));
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(started("a")).unwrap(), 2);
        bus.emit_lossy(started("b"));

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                LumenEvent::EmbeddingStarted { job_id, .. } => assert_eq!(job_id, "a"),
                other => panic!("unexpected event {:?}", other),
            }
            match rx.recv().await.unwrap() {
                LumenEvent::EmbeddingStarted { job_id, .. } => assert_eq!(job_id, "b"),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LumenEvent::EmbeddingCompleted {
            job_id: "doc-1".to_string(),
            reason: CompletionReason::GuardTimeout,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EmbeddingCompleted");
        assert_eq!(json["reason"], "GuardTimeout");
        assert_eq!(json["job_id"], "doc-1");
        assert_eq!(event.event_type(), "EmbeddingCompleted");

        let back: LumenEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_capacity_reported() {
        assert_eq!(EventBus::new(64).capacity(), 64);
    }
}
