use crate::negotiation::NegotiationState;
use crate::transport::PeerConnectionState;

/// Output of a [`NegotiationSession`](crate::NegotiationSession), for
/// whoever drives the UI.
///
/// `L` is the local track type, `R` the remote one.
#[derive(Debug, Clone)]
pub enum SessionEvent<L, R> {
    StateChanged(NegotiationState),

    /// The local tracks now attached to the transport. Clones share the
    /// underlying media, so the owner feeds and mutes them through these.
    LocalTracks(Vec<L>),

    /// Media from the remote peer, ready to be rendered.
    RemoteTrack(R),

    ConnectionStateChanged(PeerConnectionState),
}
