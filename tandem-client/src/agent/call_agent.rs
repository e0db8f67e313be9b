use crate::agent::{AgentEvent, CallCommand, CallHandle};
use crate::error::{NegotiationError, SignalingClientError};
use crate::media::{MediaConstraints, MediaDevices, MediaTrack};
use crate::negotiation::{NegotiationSession, SessionEvent};
use crate::signaling::SignalingClient;
use crate::transport::{MediaTransport, PeerConnectionState, TransportEvent, TransportFactory};
use tandem_core::utils::default_ice_servers;
use tandem_core::{ClientSignal, ConnectionId, Descriptor, IceServerConfig, RelaySignal};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub type TrackOf<F> = <<F as TransportFactory>::Transport as MediaTransport>::Track;
pub type RemoteTrackOf<F> = <<F as TransportFactory>::Transport as MediaTransport>::RemoteTrack;

const COMMAND_BUFFER: usize = 32;
const TRANSPORT_EVENT_BUFFER: usize = 256;

/// One participant of a two-party call.
///
/// Owns the signaling channels and at most one [`NegotiationSession`].
/// Incoming offers are answered automatically. Relayed messages from
/// anyone but the current remote peer are ignored. The local tracks of
/// each call reach the owner as `SessionEvent::LocalTracks`.
pub struct CallAgent<F, D>
where
    F: TransportFactory,
{
    factory: F,
    devices: D,
    constraints: MediaConstraints,
    ice_servers: Vec<IceServerConfig>,

    signals: mpsc::UnboundedSender<ClientSignal>,
    relay_rx: mpsc::UnboundedReceiver<RelaySignal>,
    command_rx: mpsc::Receiver<CallCommand<TrackOf<F>>>,
    events: mpsc::UnboundedSender<AgentEvent<TrackOf<F>, RemoteTrackOf<F>>>,

    session: Option<NegotiationSession<F::Transport>>,
    transport_rx: Option<mpsc::Receiver<TransportEvent<RemoteTrackOf<F>>>>,
    session_events_tx: mpsc::UnboundedSender<SessionEvent<TrackOf<F>, RemoteTrackOf<F>>>,
    session_events_rx: mpsc::UnboundedReceiver<SessionEvent<TrackOf<F>, RemoteTrackOf<F>>>,
}

impl<F, D> CallAgent<F, D>
where
    F: TransportFactory,
    D: MediaDevices<Track = TrackOf<F>>,
{
    pub fn new(
        factory: F,
        devices: D,
        signals: mpsc::UnboundedSender<ClientSignal>,
        relay_rx: mpsc::UnboundedReceiver<RelaySignal>,
    ) -> (
        Self,
        CallHandle<TrackOf<F>>,
        mpsc::UnboundedReceiver<AgentEvent<TrackOf<F>, RemoteTrackOf<F>>>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, events_rx) = mpsc::unbounded_channel();
        let (session_events_tx, session_events_rx) = mpsc::unbounded_channel();

        let agent = Self {
            factory,
            devices,
            constraints: MediaConstraints::default(),
            ice_servers: default_ice_servers(),
            signals,
            relay_rx,
            command_rx,
            events,
            session: None,
            transport_rx: None,
            session_events_tx,
            session_events_rx,
        };

        (agent, CallHandle::new(command_tx), events_rx)
    }

    /// Opens a WebSocket to the relay and builds an agent on top of it.
    pub async fn connect(
        url: &str,
        factory: F,
        devices: D,
    ) -> Result<
        (
            Self,
            CallHandle<TrackOf<F>>,
            mpsc::UnboundedReceiver<AgentEvent<TrackOf<F>, RemoteTrackOf<F>>>,
        ),
        SignalingClientError,
    > {
        let (signals, relay_rx) = SignalingClient::connect(url).await?.into_parts();
        Ok(Self::new(factory, devices, signals, relay_rx))
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Runs until `Shutdown`, until every handle is dropped, or until the
    /// relay connection goes away. Any call in progress is torn down.
    pub async fn run(mut self) {
        info!("Call agent started");

        loop {
            tokio::select! {
                signal = self.relay_rx.recv() => {
                    match signal {
                        Some(s) => self.handle_relay_signal(s).await,
                        None => {
                            info!("Relay connection closed. Stopping agent.");
                            break;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(CallCommand::Shutdown) | None => break,
                        Some(c) => self.handle_command(c).await,
                    }
                }

                Some(evt) = recv_opt(&mut self.transport_rx) => {
                    self.handle_transport_event(evt).await;
                }
            }

            self.flush_session_events();
        }

        self.end_call().await;
        info!("Call agent stopped");
    }

    async fn handle_relay_signal(&mut self, signal: RelaySignal) {
        if let (Some(from), Some(peer)) = (signal.sender(), self.remote_peer()) {
            if from != peer {
                debug!("Ignoring signal from {}, not the current peer", from);
                return;
            }
        }

        match signal {
            RelaySignal::Welcome { id, ice_servers } => {
                info!("Relay assigned identity {}", id);
                if !ice_servers.is_empty() {
                    self.ice_servers = ice_servers;
                }
                self.emit(AgentEvent::Welcomed { id });
            }

            RelaySignal::UserJoined { id, email } => {
                self.emit(AgentEvent::PeerJoined { id, email });
            }

            RelaySignal::IncomingCall { from, offer } => self.answer_call(from, offer).await,

            RelaySignal::CallAccepted { from, answer } => {
                let Some(session) = self.session.as_mut() else {
                    debug!("Answer from {} with no call in progress", from);
                    return;
                };
                match session.apply_answer(answer).await {
                    Ok(()) => {}
                    Err(e @ NegotiationError::InvalidState { .. }) => {
                        warn!("Unexpected answer from {}: {}", from, e);
                    }
                    Err(e) => self.fail_call(e.to_string()).await,
                }
            }

            RelaySignal::IceCandidate { from, candidate } => {
                let Some(session) = self.session.as_mut() else {
                    debug!("Candidate from {} with no call in progress", from);
                    return;
                };
                session.add_remote_candidate(candidate).await;
            }

            RelaySignal::PeerLeft { id } => {
                let was_remote = self.remote_peer() == Some(id);
                self.emit(AgentEvent::PeerLeft { id });
                if was_remote {
                    info!("Remote peer {} left, ending call", id);
                    self.end_call().await;
                }
            }

            RelaySignal::RoomFull { room, capacity } => {
                warn!("Room '{}' is full ({} members)", room, capacity);
                self.emit(AgentEvent::RoomFull { room, capacity });
            }
        }
    }

    async fn handle_command(&mut self, cmd: CallCommand<TrackOf<F>>) {
        match cmd {
            CallCommand::JoinRoom { room, email } => {
                if self.signals.send(ClientSignal::JoinRoom { room, email }).is_err() {
                    error!("Signaling channel closed, cannot join room");
                }
            }

            CallCommand::Call { to } => self.place_call(to).await,

            CallCommand::ReplaceTrack(track) => {
                let Some(session) = self.session.as_mut() else {
                    warn!("No call in progress, track not replaced");
                    return;
                };
                match session.replace_track(track).await {
                    Ok(Some(previous)) => debug!("Outgoing track {} replaced", previous.id()),
                    Ok(None) => warn!("No outgoing track of that kind to replace"),
                    Err(e) => warn!("Track replacement failed: {}", e),
                }
            }

            CallCommand::SetMediaEnabled { kind, enabled } => {
                if let Some(session) = &self.session {
                    session.set_media_enabled(kind, enabled);
                }
            }

            CallCommand::EndCall => self.end_call().await,

            CallCommand::Shutdown => {}
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent<RemoteTrackOf<F>>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let lost = matches!(
            event,
            TransportEvent::ConnectionStateChanged(
                PeerConnectionState::Failed | PeerConnectionState::Closed
            )
        );

        if let Err(e) = session.on_transport_event(event) {
            self.fail_call(e.to_string()).await;
            return;
        }
        if lost {
            info!("Peer connection lost, ending call");
            self.end_call().await;
        }
    }

    async fn place_call(&mut self, to: ConnectionId) {
        if self.session.is_some() {
            self.emit(AgentEvent::CallFailed {
                reason: "a call is already in progress".into(),
            });
            return;
        }

        let Some(mut session) = self.new_session().await else {
            return;
        };

        match session.start_call(&self.devices, self.constraints, to).await {
            Ok(()) => self.session = Some(session),
            Err(e) => {
                session.close().await;
                self.transport_rx = None;
                self.emit(AgentEvent::CallFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn answer_call(&mut self, from: ConnectionId, offer: Descriptor) {
        if self.session.is_some() {
            warn!("Busy, ignoring call from {}", from);
            return;
        }

        self.emit(AgentEvent::IncomingCall { from });

        let Some(mut session) = self.new_session().await else {
            return;
        };

        match session
            .accept_call(&self.devices, self.constraints, from, offer)
            .await
        {
            Ok(()) => self.session = Some(session),
            Err(e) => {
                session.close().await;
                self.transport_rx = None;
                self.emit(AgentEvent::CallFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn new_session(&mut self) -> Option<NegotiationSession<F::Transport>> {
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_EVENT_BUFFER);

        match self.factory.create(&self.ice_servers, transport_tx).await {
            Ok(transport) => {
                self.transport_rx = Some(transport_rx);
                Some(NegotiationSession::new(
                    transport,
                    self.signals.clone(),
                    self.session_events_tx.clone(),
                ))
            }
            Err(e) => {
                error!("Failed to create transport: {:#}", e);
                self.emit(AgentEvent::CallFailed {
                    reason: format!("{:#}", e),
                });
                None
            }
        }
    }

    async fn end_call(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.close().await;
        self.transport_rx = None;
        self.emit(AgentEvent::CallEnded);
    }

    async fn fail_call(&mut self, reason: String) {
        warn!("Call failed: {}", reason);
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.transport_rx = None;
        self.emit(AgentEvent::CallFailed { reason });
    }

    fn remote_peer(&self) -> Option<ConnectionId> {
        self.session.as_ref().and_then(|s| s.remote_peer())
    }

    /// Session events go out ahead of whatever the agent reports next.
    fn emit(&mut self, event: AgentEvent<TrackOf<F>, RemoteTrackOf<F>>) {
        self.flush_session_events();
        let _ = self.events.send(event);
    }

    fn flush_session_events(&mut self) {
        while let Ok(event) = self.session_events_rx.try_recv() {
            let _ = self.events.send(AgentEvent::Session(event));
        }
    }
}

async fn recv_opt<M>(rx: &mut Option<mpsc::Receiver<M>>) -> Option<M> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
