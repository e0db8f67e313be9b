use crate::error::RegistryError;
use dashmap::DashMap;
use std::collections::HashSet;
use tandem_core::{ConnectionId, RelaySignal};
use tokio::sync::mpsc;

/// Outbound half of a live connection. Whatever is pushed here ends up on
/// that client's socket.
pub type Outbox = mpsc::UnboundedSender<RelaySignal>;

struct ConnectionEntry {
    outbox: Outbox,
    label: Option<String>,
    rooms: HashSet<String>,
}

/// Result of a capacity-checked join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Newly added. `peers` are the other members at the moment of joining.
    Joined { peers: Vec<ConnectionId> },
    AlreadyMember,
    Full { capacity: usize },
}

/// The record `unregister` removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departed {
    pub id: ConnectionId,
    pub label: Option<String>,
    pub rooms: Vec<String>,
}

/// Live connections and room membership.
///
/// Lock order is always `connections` before `rooms`: a join holds the
/// joiner's connection entry while it mutates the room, so it cannot
/// interleave with that connection's `unregister`.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections.insert(
            id,
            ConnectionEntry {
                outbox,
                label: None,
                rooms: HashSet::new(),
            },
        );
        id
    }

    /// Adds `id` to `room` with no capacity limit. `Ok(false)` if it was
    /// already a member.
    pub fn join(&self, id: ConnectionId, room: &str) -> Result<bool, RegistryError> {
        match self.try_join(id, room, 0)? {
            JoinOutcome::Joined { .. } => Ok(true),
            _ => Ok(false),
        }
    }

    /// Adds `id` to `room` unless the room already holds `capacity`
    /// members. A capacity of zero means unbounded.
    pub fn try_join(
        &self,
        id: ConnectionId,
        room: &str,
        capacity: usize,
    ) -> Result<JoinOutcome, RegistryError> {
        let mut connection = self
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;

        if connection.rooms.contains(room) {
            return Ok(JoinOutcome::AlreadyMember);
        }

        let mut members = self.rooms.entry(room.to_owned()).or_default();
        if capacity > 0 && members.len() >= capacity {
            return Ok(JoinOutcome::Full { capacity });
        }

        let peers = members.iter().copied().collect();
        members.insert(id);
        connection.rooms.insert(room.to_owned());

        Ok(JoinOutcome::Joined { peers })
    }

    pub fn leave(&self, id: ConnectionId, room: &str) -> bool {
        let removed = match self.connections.get_mut(&id) {
            Some(mut connection) => connection.rooms.remove(room),
            None => false,
        };

        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());

        removed
    }

    /// Removes `id` from every room and forgets it. Returns `None` when the
    /// identity is already gone.
    pub fn unregister(&self, id: ConnectionId) -> Option<Departed> {
        let (_, entry) = self.connections.remove(&id)?;

        let mut rooms: Vec<String> = entry.rooms.into_iter().collect();
        rooms.sort();

        for room in &rooms {
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.remove(&id);
            }
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }

        Some(Departed {
            id,
            label: entry.label,
            rooms,
        })
    }

    pub fn members_of(&self, room: &str) -> HashSet<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, id: ConnectionId) -> HashSet<String> {
        self.connections
            .get(&id)
            .map(|connection| connection.rooms.clone())
            .unwrap_or_default()
    }

    pub fn set_label(&self, id: ConnectionId, label: String) -> bool {
        let Some(mut connection) = self.connections.get_mut(&id) else {
            return false;
        };
        connection.label = Some(label);
        true
    }

    pub fn label_of(&self, id: ConnectionId) -> Option<String> {
        self.connections
            .get(&id)
            .and_then(|connection| connection.label.clone())
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Queues `signal` on the destination's outbox. `false` when the
    /// destination is unknown or its socket task has gone away.
    pub fn deliver(&self, to: ConnectionId, signal: RelaySignal) -> bool {
        let Some(connection) = self.connections.get(&to) else {
            return false;
        };
        connection.outbox.send(signal).is_ok()
    }
}
