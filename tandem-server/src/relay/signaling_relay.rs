use crate::registry::{ConnectionRegistry, JoinOutcome, Outbox};
use crate::relay::RelayConfig;
use std::sync::Arc;
use tandem_core::{ClientSignal, ConnectionId, RelaySignal};
use tracing::{debug, info, warn};

/// Routes signaling frames between connections.
///
/// Payloads are never inspected; the relay only reads the frame type and
/// the destination identity. Delivery is best effort: a frame addressed
/// to an identity with no live connection is dropped without telling the
/// sender.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: Arc<ConnectionRegistry>,
    config: Arc<RelayConfig>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, config: RelayConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Registers a new connection and greets it with its identity.
    pub fn connect(&self, outbox: Outbox) -> ConnectionId {
        let id = self.registry.register(outbox);
        info!("Connection {} registered", id);

        self.registry.deliver(
            id,
            RelaySignal::Welcome {
                id,
                ice_servers: self.config.ice_servers.clone(),
            },
        );
        id
    }

    pub fn handle(&self, from: ConnectionId, signal: ClientSignal) {
        if !self.registry.contains(from) {
            warn!("Dropping signal from unregistered connection {}", from);
            return;
        }

        match signal {
            ClientSignal::JoinRoom { room, email } => self.join_room(from, room, email),

            ClientSignal::LeaveRoom { room } => self.leave_room(from, &room),

            ClientSignal::CallOffer { to, offer } => {
                self.forward(to, RelaySignal::IncomingCall { from, offer });
            }

            ClientSignal::CallAccepted { to, answer } => {
                self.forward(to, RelaySignal::CallAccepted { from, answer });
            }

            ClientSignal::IceCandidate { to, candidate } => {
                self.forward(to, RelaySignal::IceCandidate { from, candidate });
            }
        }
    }

    /// Transport-level disconnect hook. Safe to call more than once; only
    /// the first call has any effect.
    pub fn disconnect(&self, id: ConnectionId) {
        let Some(departed) = self.registry.unregister(id) else {
            debug!("Connection {} already unregistered", id);
            return;
        };

        info!(
            "Connection {} unregistered (left {} room(s))",
            id,
            departed.rooms.len()
        );

        for room in &departed.rooms {
            self.announce_departure(id, room);
        }
    }

    fn join_room(&self, from: ConnectionId, room: String, email: Option<String>) {
        if let Some(label) = email {
            self.registry.set_label(from, label);
        }

        match self
            .registry
            .try_join(from, &room, self.config.room_capacity)
        {
            Ok(JoinOutcome::Joined { peers }) => {
                info!("Connection {} joined room '{}'", from, room);

                let email = self.registry.label_of(from);
                for peer in peers {
                    self.registry.deliver(
                        peer,
                        RelaySignal::UserJoined {
                            id: from,
                            email: email.clone(),
                        },
                    );
                }
            }
            Ok(JoinOutcome::AlreadyMember) => {
                debug!("Connection {} is already in room '{}'", from, room);
            }
            Ok(JoinOutcome::Full { capacity }) => {
                warn!(
                    "Room '{}' is full ({} members), rejecting {}",
                    room, capacity, from
                );
                self.registry
                    .deliver(from, RelaySignal::RoomFull { room, capacity });
            }
            Err(e) => warn!("Join of room '{}' failed: {}", room, e),
        }
    }

    fn leave_room(&self, from: ConnectionId, room: &str) {
        if !self.registry.leave(from, room) {
            debug!("Connection {} is not in room '{}'", from, room);
            return;
        }

        info!("Connection {} left room '{}'", from, room);
        self.announce_departure(from, room);
    }

    fn announce_departure(&self, id: ConnectionId, room: &str) {
        for member in self.registry.members_of(room) {
            self.registry.deliver(member, RelaySignal::PeerLeft { id });
        }
    }

    fn forward(&self, to: ConnectionId, signal: RelaySignal) {
        if self.registry.deliver(to, signal) {
            debug!("Relayed signal to {}", to);
        } else {
            warn!("Attempted to send signal to disconnected connection {}", to);
        }
    }
}
