mod sample_track;
mod webrtc_transport;

pub use sample_track::*;
pub use webrtc_transport::*;

use crate::media::MediaTrack;
use async_trait::async_trait;
use tandem_core::{Descriptor, IceServerConfig};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// What the media transport reports back while a call is set up and running.
#[derive(Debug, Clone)]
pub enum TransportEvent<R> {
    /// A local ICE candidate that has to reach the remote peer.
    LocalCandidate(Descriptor),

    /// The remote peer started sending a track.
    TrackArrived(R),

    ConnectionStateChanged(PeerConnectionState),
}

/// The peer-to-peer media transport, seen from signaling.
///
/// Descriptions and candidates cross this boundary as opaque
/// [`Descriptor`]s in whatever shape the transport produces and accepts.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    type Track: MediaTrack;
    type RemoteTrack: Send + 'static;

    async fn add_track(&self, track: &Self::Track) -> anyhow::Result<()>;

    /// Creates an offer and installs it as the local description.
    async fn create_offer(&self) -> anyhow::Result<Descriptor>;

    /// Creates an answer and installs it as the local description.
    async fn create_answer(&self) -> anyhow::Result<Descriptor>;

    async fn set_remote_description(&self, description: Descriptor) -> anyhow::Result<()>;

    async fn add_ice_candidate(&self, candidate: Descriptor) -> anyhow::Result<()>;

    /// Swaps the outgoing track of the same kind in place. `false` when no
    /// sender of that kind exists.
    async fn replace_track(&self, track: &Self::Track) -> anyhow::Result<bool>;

    /// Detaches the sender carrying `track`. Unknown tracks are ignored.
    async fn remove_track(&self, track: &Self::Track) -> anyhow::Result<()>;

    async fn close(&self) -> anyhow::Result<()>;
}

pub type TransportEventSender<T> = mpsc::Sender<TransportEvent<<T as MediaTransport>::RemoteTrack>>;

/// Builds one transport per call.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    type Transport: MediaTransport;

    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: TransportEventSender<Self::Transport>,
    ) -> anyhow::Result<Self::Transport>;
}
