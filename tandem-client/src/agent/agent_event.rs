use crate::negotiation::SessionEvent;
use tandem_core::ConnectionId;

/// Everything a [`CallAgent`](crate::CallAgent) reports to its owner.
#[derive(Debug, Clone)]
pub enum AgentEvent<L, R> {
    /// The relay assigned this client its identity.
    Welcomed { id: ConnectionId },

    PeerJoined {
        id: ConnectionId,
        email: Option<String>,
    },

    PeerLeft { id: ConnectionId },

    RoomFull { room: String, capacity: usize },

    /// An offer arrived and is being answered.
    IncomingCall { from: ConnectionId },

    Session(SessionEvent<L, R>),

    CallEnded,

    CallFailed { reason: String },
}
