//! Event Bus - pub/sub for workflow events
//!
//! The workflow emits, consumers (event logger, console) subscribe.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::WorkflowEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

/// Central event bus
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: WorkflowEvent) {
        debug!(event_type = event.event_type(), run_id = event.run_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle bound to one run
    pub fn emitter_for(&self, run_id: impl Into<String>) -> EventEmitter {
        let run_id = run_id.into();
        debug!(%run_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            run_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for a workflow to emit events without owning the bus
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<WorkflowEvent>,
    run_id: String,
}

impl EventEmitter {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event: WorkflowEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RunState;
    use tokio::sync::broadcast::error::TryRecvError;

    fn started(run_id: &str) -> WorkflowEvent {
        WorkflowEvent::RunStarted {
            run_id: run_id.to_string(),
            task: "write a slogan".to_string(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        bus.emit(started("run-123"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.run_id(), "run-123");
        assert_eq!(event.event_type(), "RunStarted");
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(started("run-123"));
    }

    #[tokio::test]
    async fn test_event_emitter() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("run-456");
        assert_eq!(emitter.run_id(), "run-456");

        emitter.emit(WorkflowEvent::Status {
            run_id: emitter.run_id().to_string(),
            state: RunState::InProgress,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.run_id(), "run-456");
        assert!(matches!(
            event,
            WorkflowEvent::Status {
                state: RunState::InProgress,
                ..
            }
        ));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(started("test"));

        assert_eq!(rx1.recv().await.unwrap().run_id(), "test");
        assert_eq!(rx2.recv().await.unwrap().run_id(), "test");
    }

    #[tokio::test]
    async fn test_channel_closes_when_senders_drop() {
        let bus = EventBus::new(10);
        let emitter = bus.emitter_for("r");
        let mut rx = bus.subscribe();

        drop(bus);
        emitter.emit(started("r"));
        drop(emitter);

        assert!(rx.recv().await.is_ok());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
