use crate::model::connection::ConnectionId;
use crate::model::descriptor::Descriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientSignal {
    #[serde(rename = "room:join")]
    JoinRoom {
        room: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    #[serde(rename = "room:leave")]
    LeaveRoom { room: String },
    #[serde(rename = "user:call", alias = "call:offer")]
    CallOffer { to: ConnectionId, offer: Descriptor },
    #[serde(rename = "call:accepted")]
    CallAccepted {
        to: ConnectionId,
        answer: Descriptor,
    },
    #[serde(rename = "ice:candidate")]
    IceCandidate {
        to: ConnectionId,
        candidate: Descriptor,
    },
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RelaySignal {
    #[serde(rename = "welcome")]
    Welcome {
        id: ConnectionId,
        ice_servers: Vec<IceServerConfig>,
    },
    #[serde(rename = "user:joined")]
    UserJoined {
        id: ConnectionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    #[serde(rename = "incoming:call")]
    IncomingCall {
        from: ConnectionId,
        offer: Descriptor,
    },
    #[serde(rename = "call:accepted")]
    CallAccepted {
        from: ConnectionId,
        answer: Descriptor,
    },
    #[serde(rename = "ice:candidate")]
    IceCandidate {
        from: ConnectionId,
        candidate: Descriptor,
    },
    #[serde(rename = "peer:left")]
    PeerLeft { id: ConnectionId },
    #[serde(rename = "room:full")]
    RoomFull { room: String, capacity: usize },
}

impl RelaySignal {
    /// The connection a relayed message originated from, if it has one.
    pub fn sender(&self) -> Option<ConnectionId> {
        match self {
            RelaySignal::IncomingCall { from, .. }
            | RelaySignal::CallAccepted { from, .. }
            | RelaySignal::IceCandidate { from, .. } => Some(*from),
            _ => None,
        }
    }
}
