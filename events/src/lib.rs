//! Event system infrastructure for product notifications.
//!
//! This crate decouples the write path (HTTP handlers persisting records) from
//! the delivery path (websocket fan-out).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Cheap, cloneable handle that enqueues events without
//!   waiting for them to be handled
//! - **EventDispatcher**: Owns the queue and the registered handlers; runs as a
//!   single background task
//!
//! Publishing never blocks on delivery. Events are handled one at a time in the
//! order they were published, so every handler observes the same ordering.
//!
//! This crate has no dependencies on internal crates (entity, domain, etc.),
//! avoiding circular dependencies. Entity data is carried as serialized JSON values.

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A type alias that represents any Entity's internal id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = Uuid;

/// Domain events that represent business-level changes in the system.
/// These events are emitted when domain operations complete successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// Emitted once for every product that is successfully persisted.
    ProductCreated {
        /// Id of the persisted product, for tracing.
        product_id: Id,
        /// Notification payload built from the persisted fields:
        /// `{"name": .., "price": "<decimal as string>", "description": ..}`.
        message: Value,
    },
}

impl DomainEvent {
    /// Short, stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ProductCreated { .. } => "product_created",
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Returned by [`EventPublisher::publish`] when the dispatcher is no longer
/// running. Carries the event that could not be enqueued.
#[derive(Debug, PartialEq)]
pub struct PublishError {
    pub event: DomainEvent,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "event dispatcher is not running, dropped {} event",
            self.event.name()
        )
    }
}

impl StdError for PublishError {}

/// Publishes domain events to the dispatcher queue.
///
/// `publish` returns as soon as the event is queued; it does not wait for any
/// handler to run.
#[derive(Clone, Debug)]
pub struct EventPublisher {
    sender: UnboundedSender<DomainEvent>,
}

impl EventPublisher {
    /// Creates a connected publisher/dispatcher pair. The dispatcher starts with
    /// no handlers; register them before calling [`EventDispatcher::spawn`].
    pub fn channel() -> (Self, EventDispatcher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self { sender },
            EventDispatcher {
                receiver,
                handlers: Vec::new(),
            },
        )
    }

    /// Enqueue an event for asynchronous handling.
    pub fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        debug!("Publishing {} event", event.name());
        self.sender
            .send(event)
            .map_err(|mpsc::error::SendError(event)| PublishError { event })
    }

    /// Whether the dispatcher side of the queue is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Drains published events and hands each one to every registered handler.
pub struct EventDispatcher {
    receiver: UnboundedReceiver<DomainEvent>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Register a new event handler. Handlers run in registration order.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Run the dispatch loop on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Dispatch events until every [`EventPublisher`] has been dropped.
    pub async fn run(mut self) {
        info!(
            "Event dispatcher started with {} handler(s)",
            self.handlers.len()
        );

        while let Some(event) = self.receiver.recv().await {
            debug!("Dispatching {} event", event.name());
            for handler in self.handlers.iter() {
                handler.handle(&event).await;
            }
        }

        info!("Event dispatcher stopped: all publishers dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, event: &DomainEvent) {
            self.seen.lock().unwrap().push(event.clone());
        }
    }

    fn product_created(name: &str) -> DomainEvent {
        DomainEvent::ProductCreated {
            product_id: Id::new_v4(),
            message: json!({"name": name, "price": "1.00", "description": ""}),
        }
    }

    #[tokio::test]
    async fn published_events_reach_every_handler_in_order() {
        let first = Arc::new(RecordingHandler::default());
        let second = Arc::new(RecordingHandler::default());

        let (publisher, dispatcher) = EventPublisher::channel();
        let handle = dispatcher
            .with_handler(first.clone())
            .with_handler(second.clone())
            .spawn();

        let events = vec![product_created("a"), product_created("b"), product_created("c")];
        for event in events.iter().cloned() {
            publisher.publish(event).unwrap();
        }

        // Dropping the last publisher lets the dispatcher drain and exit.
        drop(publisher);
        handle.await.unwrap();

        assert_eq!(*first.seen.lock().unwrap(), events);
        assert_eq!(*second.seen.lock().unwrap(), events);
    }

    #[tokio::test]
    async fn publish_does_not_wait_for_handlers() {
        let handler = Arc::new(RecordingHandler::default());
        let (publisher, dispatcher) = EventPublisher::channel();
        let dispatcher = dispatcher.with_handler(handler.clone());

        // The dispatcher is not running yet, so nothing can have been handled.
        publisher.publish(product_created("queued")).unwrap();
        assert!(handler.seen.lock().unwrap().is_empty());

        drop(publisher);
        dispatcher.run().await;

        assert_eq!(handler.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publish_fails_once_the_dispatcher_is_gone() {
        let (publisher, dispatcher) = EventPublisher::channel();
        drop(dispatcher);

        let event = product_created("lost");
        let err = publisher.publish(event.clone()).unwrap_err();

        assert!(publisher.is_closed());
        assert_eq!(err.event, event);
        assert_eq!(
            err.to_string(),
            "event dispatcher is not running, dropped product_created event"
        );
    }
}
