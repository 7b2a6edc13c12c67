//! Per-connection subscriber lifecycle.
//!
//! A [`Consumer`] is created when a websocket handshake completes and lives
//! until the socket ends. The transport itself is driven by the web layer; this
//! type owns group membership and frame rendering so both can be exercised
//! without a socket.

use crate::connection::{ConnectionId, GroupName};
use crate::message::{EventKind, Frame, GroupEvent};
use crate::Manager;
use log::*;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Why a connection left its group. Only used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client sent a close frame, optionally with a close code.
    ClientClosed(Option<u16>),
    /// The inbound stream ended without a close frame.
    StreamEnded,
    /// Reading from or writing to the socket failed.
    TransportError(String),
    /// The consumer was dropped without an explicit disconnect.
    Dropped,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisconnectReason::ClientClosed(Some(code)) => write!(f, "client closed ({code})"),
            DisconnectReason::ClientClosed(None) => write!(f, "client closed"),
            DisconnectReason::StreamEnded => write!(f, "stream ended"),
            DisconnectReason::TransportError(e) => write!(f, "transport error: {e}"),
            DisconnectReason::Dropped => write!(f, "dropped"),
        }
    }
}

pub struct Consumer {
    manager: Arc<Manager>,
    group: GroupName,
    connection_id: ConnectionId,
    state: ConnectionState,
}

impl Consumer {
    /// Join `group`. Events published to the group from now on are queued on
    /// the returned receiver until [`Consumer::disconnect`] is called.
    pub fn connect(manager: Arc<Manager>, group: GroupName) -> (Self, UnboundedReceiver<GroupEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = manager.join_group(group.clone(), tx);

        (
            Self {
                manager,
                group,
                connection_id,
                state: ConnectionState::Connected,
            },
            rx,
        )
    }

    /// Leave the group. Calling this again, whatever the reason, is a no-op.
    pub fn disconnect(&mut self, reason: DisconnectReason) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        debug!(
            "Connection {} disconnecting from group {}: {reason}",
            self.connection_id, self.group
        );
        self.manager.leave_group(&self.connection_id);
        self.state = ConnectionState::Disconnected;
    }

    /// Render a group event as the text frame sent to the client.
    pub fn render(event: &GroupEvent) -> serde_json::Result<String> {
        match event.kind {
            EventKind::SendProductNotification => serde_json::to_string(&Frame {
                message: &event.message,
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn group(&self) -> &GroupName {
        &self.group
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.disconnect(DisconnectReason::Dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(name: &str) -> GroupEvent {
        GroupEvent::new(
            EventKind::SendProductNotification,
            json!({"name": name, "price": "9.99", "description": "A widget"}),
        )
    }

    #[test]
    fn connect_makes_the_connection_a_member_immediately() {
        let manager = Arc::new(Manager::new());

        let (consumer, _rx) = Consumer::connect(manager.clone(), GroupName::products());

        assert_eq!(consumer.state(), ConnectionState::Connected);
        assert!(manager.is_member(consumer.connection_id()));
        assert_eq!(manager.group_size(&GroupName::products()), 1);
    }

    #[test]
    fn connected_consumer_receives_group_events() {
        let manager = Arc::new(Manager::new());
        let (_consumer, mut rx) = Consumer::connect(manager.clone(), GroupName::products());

        manager.group_send(&GroupName::products(), notification("Widget"));

        assert_eq!(rx.try_recv().unwrap(), notification("Widget"));
    }

    #[test]
    fn disconnected_consumer_never_receives_later_events() {
        let manager = Arc::new(Manager::new());
        let (mut consumer, mut rx) = Consumer::connect(manager.clone(), GroupName::products());

        consumer.disconnect(DisconnectReason::ClientClosed(Some(1000)));
        let delivered = manager.group_send(&GroupName::products(), notification("Late"));

        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(consumer.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn disconnect_twice_does_not_affect_other_members() {
        let manager = Arc::new(Manager::new());
        let (mut first, _rx1) = Consumer::connect(manager.clone(), GroupName::products());
        let (second, mut rx2) = Consumer::connect(manager.clone(), GroupName::products());

        first.disconnect(DisconnectReason::StreamEnded);
        first.disconnect(DisconnectReason::TransportError("reset".to_owned()));

        assert!(manager.is_member(second.connection_id()));
        manager.group_send(&GroupName::products(), notification("Widget"));
        assert_eq!(rx2.try_recv().unwrap(), notification("Widget"));
    }

    #[test]
    fn dropping_a_consumer_leaves_the_group() {
        let manager = Arc::new(Manager::new());
        let (consumer, _rx) = Consumer::connect(manager.clone(), GroupName::products());
        let connection_id = consumer.connection_id().clone();

        drop(consumer);

        assert!(!manager.is_member(&connection_id));
        assert_eq!(manager.group_size(&GroupName::products()), 0);
    }

    #[test]
    fn one_vanished_subscriber_does_not_block_the_others() {
        let manager = Arc::new(Manager::new());
        let (_gone, rx_gone) = Consumer::connect(manager.clone(), GroupName::products());
        let (_a, mut rx_a) = Consumer::connect(manager.clone(), GroupName::products());
        let (_b, mut rx_b) = Consumer::connect(manager.clone(), GroupName::products());
        drop(rx_gone);

        let delivered = manager.group_send(&GroupName::products(), notification("Widget"));

        assert_eq!(delivered, 2);
        assert_eq!(rx_a.try_recv().unwrap(), notification("Widget"));
        assert_eq!(rx_b.try_recv().unwrap(), notification("Widget"));
    }

    #[test]
    fn events_arrive_in_publish_order() {
        let manager = Arc::new(Manager::new());
        let (_consumer, mut rx) = Consumer::connect(manager.clone(), GroupName::products());

        manager.group_send(&GroupName::products(), notification("first"));
        manager.group_send(&GroupName::products(), notification("second"));

        assert_eq!(rx.try_recv().unwrap(), notification("first"));
        assert_eq!(rx.try_recv().unwrap(), notification("second"));
    }

    #[test]
    fn render_wraps_the_message_field() {
        let frame = Consumer::render(&notification("Widget")).unwrap();

        assert_eq!(
            frame,
            r#"{"message":{"name":"Widget","price":"9.99","description":"A widget"}}"#
        );
    }
}
