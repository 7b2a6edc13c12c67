//! Group-based websocket broadcast infrastructure.
//!
//! Connected websocket clients join a named group; events published to a group
//! are fanned out to every connection that is a member at that moment.
//!
//! # Architecture
//!
//! - **Dual-index registry**: O(1) lookups for both connection cleanup and
//!   group fan-out via separate DashMap indices.
//! - **Ephemeral events**: nothing is stored. A client that is not connected
//!   when an event is sent never sees it.
//! - **Isolated delivery**: each connection has its own queue; a connection
//!   that has gone away is skipped and pruned without affecting the others.
//! - **Typed event kinds**: [`message::EventKind`] is an enum, and rendering
//!   is an exhaustive `match`, so an event kind without a renderer does not
//!   compile.
//!
//! # Message Flow
//!
//! 1. Client opens a websocket on `/ws/products/`
//! 2. [`consumer::Consumer::connect`] joins the `product_group` group
//! 3. A product is created and the domain layer publishes
//!    `DomainEvent::ProductCreated`
//! 4. The event dispatcher calls [`WsDomainEventHandler`], which calls
//!    [`Manager::group_send`]
//! 5. Each member's socket task renders the event with
//!    [`consumer::Consumer::render`] and writes a text frame
//!
//! # Modules
//!
//! - `connection`: GroupRegistry, ConnectionId and GroupName
//! - `consumer`: per-connection lifecycle (connect, disconnect, render)
//! - `domain_event_handler`: maps domain events to group events
//! - `manager`: group membership and fan-out (delegates to GroupRegistry)
//! - `message`: event kinds and group event payloads

pub mod connection;
pub mod consumer;
pub mod domain_event_handler;
pub mod manager;
pub mod message;

pub use connection::{GroupName, PRODUCT_GROUP};
pub use domain_event_handler::WsDomainEventHandler;
pub use manager::Manager;
