use crate::connection::{ConnectionId, GroupName, GroupRegistry};
use crate::message::GroupEvent;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Broker front-end: group membership and fan-out.
pub struct Manager {
    registry: Arc<GroupRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(GroupRegistry::new()),
        }
    }

    /// Add a connection to `group` and return its unique ID
    pub fn join_group(&self, group: GroupName, sender: UnboundedSender<GroupEvent>) -> ConnectionId {
        let connection_id = self.registry.add(group.clone(), sender);
        info!("Connection {connection_id} joined group {group}");
        connection_id
    }

    /// Remove a connection from its group. Safe to call more than once.
    pub fn leave_group(&self, connection_id: &ConnectionId) {
        if self.registry.discard(connection_id) {
            info!("Connection {connection_id} left its group");
        } else {
            debug!("Connection {connection_id} was not in any group");
        }
    }

    /// Fan `event` out to every current member of `group`.
    ///
    /// Returns once the event is queued on each member's connection; it does
    /// not wait for frames to reach clients.
    pub fn group_send(&self, group: &GroupName, event: GroupEvent) -> usize {
        let delivered = self.registry.send_to_group(group, &event);
        debug!(
            "Sent {} to {delivered} connection(s) in group {group}",
            event.kind.handler_name()
        );
        delivered
    }

    pub fn group_size(&self, group: &GroupName) -> usize {
        self.registry.group_size(group)
    }

    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.registry.contains(connection_id)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
