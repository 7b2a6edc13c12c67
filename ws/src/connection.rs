use crate::message::GroupEvent;
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Group that every product notification is published to.
pub const PRODUCT_GROUP: &str = "product_group";

const MAX_GROUP_NAME_LEN: usize = 100;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a broadcast group.
///
/// Valid names are non-empty, shorter than 100 characters, and contain only
/// ASCII alphanumerics, hyphens, underscores or periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupName(String);

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidGroupName(pub String);

impl fmt::Display for InvalidGroupName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid group name: {:?}", self.0)
    }
}

impl std::error::Error for InvalidGroupName {}

impl GroupName {
    pub fn parse(name: &str) -> Result<Self, InvalidGroupName> {
        let valid = !name.is_empty()
            && name.len() < MAX_GROUP_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if valid {
            Ok(Self(name.to_owned()))
        } else {
            Err(InvalidGroupName(name.to_owned()))
        }
    }

    /// The group product notifications are fanned out to.
    pub fn products() -> Self {
        Self(PRODUCT_GROUP.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection information (no redundant connection_id)
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub group: GroupName,
    pub sender: UnboundedSender<GroupEvent>,
}

/// Group membership registry with dual indices for O(1) lookups.
///
/// A connection is a member of exactly one group for its whole lifetime.
pub struct GroupRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: members of each group for fan-out - O(1)
    group_index: DashMap<GroupName, HashSet<ConnectionId>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            group_index: DashMap::new(),
        }
    }

    /// Add a new connection to `group` - O(1)
    pub fn add(&self, group: GroupName, sender: UnboundedSender<GroupEvent>) -> ConnectionId {
        let connection_id = ConnectionId::new();

        // Insert into primary storage
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                group: group.clone(),
                sender,
            },
        );

        // Update secondary index
        self.group_index
            .entry(group)
            .or_default()
            .insert(connection_id.clone());

        connection_id
    }

    /// Remove a connection from its group - O(1). Removing an unknown or
    /// already-removed connection is a no-op. Returns whether anything was removed.
    pub fn discard(&self, connection_id: &ConnectionId) -> bool {
        let Some((_, info)) = self.connections.remove(connection_id) else {
            return false;
        };

        if let Some(mut members) = self.group_index.get_mut(&info.group) {
            members.remove(connection_id);

            // Clean up empty groups
            if members.is_empty() {
                drop(members); // Release lock before removal
                self.group_index
                    .remove_if(&info.group, |_, members| members.is_empty());
            }
        }

        true
    }

    /// Send `event` to every current member of `group` - O(k) where k = group size.
    ///
    /// A member whose receiving side is gone is skipped and pruned; it never
    /// stops delivery to the remaining members. Returns how many members the
    /// event was handed to.
    pub fn send_to_group(&self, group: &GroupName, event: &GroupEvent) -> usize {
        // Snapshot membership so no index lock is held while sending.
        let members: Vec<ConnectionId> = match self.group_index.get(group) {
            Some(members) => members.iter().cloned().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for connection_id in members {
            let Some(info) = self.connections.get(&connection_id) else {
                continue;
            };

            match info.sender.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Failed to send {} to connection {} in group {}: {}",
                        event.kind.handler_name(),
                        connection_id,
                        group,
                        e
                    );
                    dead.push(connection_id.clone());
                }
            }
        }

        for connection_id in dead.iter() {
            self.discard(connection_id);
        }

        delivered
    }

    /// Number of connections currently in `group`.
    pub fn group_size(&self, group: &GroupName) -> usize {
        self.group_index
            .get(group)
            .map(|members| members.len())
            .unwrap_or(0)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
