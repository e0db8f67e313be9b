use crate::negotiation::NegotiationState;
use thiserror::Error;

/// Failures of the local media layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission to use media devices was denied")]
    PermissionDenied,

    #[error("no device satisfies the requested constraints")]
    NotFound,

    #[error("media device error: {0}")]
    Device(String),
}

#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("operation requires state {expected:?}, session is {actual:?}")]
    InvalidState {
        expected: NegotiationState,
        actual: NegotiationState,
    },

    #[error("failed to acquire local media: {0}")]
    MediaAcquisition(#[source] MediaError),

    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    /// The channel towards the relay is gone.
    #[error("signaling channel closed")]
    SignalingClosed,
}

#[derive(Error, Debug)]
pub enum SignalingClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("signaling connection closed")]
    Closed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("call agent has stopped")]
pub struct AgentStopped;
