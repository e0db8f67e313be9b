use crate::media::{MediaKind, MediaTrack};
use crate::transport::{
    MediaTransport, PeerConnectionState, SampleTrack, TransportEvent, TransportEventSender,
    TransportFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{Descriptor, IceServerConfig};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_remote::TrackRemote;

/// A webrtc-rs peer connection behind [`MediaTransport`].
///
/// Descriptions travel as `{"type": ..., "sdp": ...}` and candidates as
/// `RTCIceCandidateInit` JSON, the same shapes a browser produces.
pub struct WebRtcTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    /// Builds the peer connection and wires its callbacks into `events`.
    pub async fn new(
        ice_servers: &[IceServerConfig],
        events: TransportEventSender<Self>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {}", s);
                    let _ = tx
                        .send(TransportEvent::ConnectionStateChanged(map_state(s)))
                        .await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                // `None` marks the end of gathering.
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let Ok(value) = serde_json::to_value(&init) else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::LocalCandidate(Descriptor::new(value)))
                    .await;
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    debug!("Remote {} track {} arrived", track.kind(), track.id());
                    let _ = tx.send(TransportEvent::TrackArrived(track)).await;
                })
            },
        ));

        Ok(Self { peer_connection })
    }

    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl MediaTransport for WebRtcTransport {
    type Track = SampleTrack;
    type RemoteTrack = Arc<TrackRemote>;

    async fn add_track(&self, track: &SampleTrack) -> Result<()> {
        let sender = self.peer_connection.add_track(track.local()).await?;

        // RTCP has to be drained for the interceptors to work.
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while sender.read(&mut rtcp_buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn create_offer(&self) -> Result<Descriptor> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(Descriptor::new(serde_json::to_value(&offer)?))
    }

    async fn create_answer(&self) -> Result<Descriptor> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(Descriptor::new(serde_json::to_value(&answer)?))
    }

    async fn set_remote_description(&self, description: Descriptor) -> Result<()> {
        let desc: RTCSessionDescription = serde_json::from_value(description.into_value())
            .context("Failed to parse session description")?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Descriptor) -> Result<()> {
        let candidate: RTCIceCandidateInit = serde_json::from_value(candidate.into_value())
            .context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn replace_track(&self, track: &SampleTrack) -> Result<bool> {
        let wanted = codec_type(track.kind());

        for sender in self.peer_connection.get_senders().await {
            let Some(current) = sender.track().await else {
                continue;
            };
            if current.kind() != wanted {
                continue;
            }

            sender.replace_track(Some(track.local())).await?;
            debug!("Replaced outgoing {} track with {}", wanted, track.id());
            return Ok(true);
        }
        Ok(false)
    }

    async fn remove_track(&self, track: &SampleTrack) -> Result<()> {
        let id = track.id();

        for sender in self.peer_connection.get_senders().await {
            let Some(current) = sender.track().await else {
                continue;
            };
            if current.id() == id {
                self.peer_connection.remove_track(&sender).await?;
                debug!("Removed outgoing track {}", id);
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Creates a fresh [`WebRtcTransport`] for every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebRtcTransportFactory;

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    type Transport = WebRtcTransport;

    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: TransportEventSender<WebRtcTransport>,
    ) -> Result<WebRtcTransport> {
        WebRtcTransport::new(ice_servers, events).await
    }
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
    }
}

fn map_state(state: RTCPeerConnectionState) -> PeerConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
            PeerConnectionState::New
        }
        RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
        RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => PeerConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
        RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
    }
}

fn codec_type(kind: MediaKind) -> RTPCodecType {
    match kind {
        MediaKind::Audio => RTPCodecType::Audio,
        MediaKind::Video => RTPCodecType::Video,
    }
}
