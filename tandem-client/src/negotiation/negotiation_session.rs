use crate::error::NegotiationError;
use crate::media::{MediaConstraints, MediaDevices, MediaKind, MediaTrack};
use crate::negotiation::{NegotiationState, SessionEvent};
use crate::transport::{MediaTransport, TransportEvent};
use std::collections::VecDeque;
use tandem_core::{ClientSignal, ConnectionId, Descriptor};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub type SessionEventSender<T> = mpsc::UnboundedSender<
    SessionEvent<<T as MediaTransport>::Track, <T as MediaTransport>::RemoteTrack>,
>;

/// Drives one peer connection through offer, answer and candidate exchange.
///
/// Remote candidates are never handed to the transport before a remote
/// description is in place. Until then they are buffered, and the buffer
/// is flushed in arrival order right after the description is applied.
/// Local candidates wait in a queue until the remote peer is known.
///
/// Dropping a session stops its tracks but cannot close the transport,
/// which needs an `.await`. Call [`close`](Self::close) first.
pub struct NegotiationSession<T: MediaTransport> {
    transport: T,
    state: NegotiationState,
    remote_peer: Option<ConnectionId>,
    local_tracks: Vec<T::Track>,
    attached_tracks: usize,
    displaced_tracks: Vec<T::Track>,
    pending_local_candidates: VecDeque<Descriptor>,
    pending_remote_candidates: VecDeque<Descriptor>,
    remote_description_set: bool,
    signals: mpsc::UnboundedSender<ClientSignal>,
    events: SessionEventSender<T>,
}

impl<T: MediaTransport> NegotiationSession<T> {
    pub fn new(
        transport: T,
        signals: mpsc::UnboundedSender<ClientSignal>,
        events: SessionEventSender<T>,
    ) -> Self {
        Self {
            transport,
            state: NegotiationState::Idle,
            remote_peer: None,
            local_tracks: Vec::new(),
            attached_tracks: 0,
            displaced_tracks: Vec::new(),
            pending_local_candidates: VecDeque::new(),
            pending_remote_candidates: VecDeque::new(),
            remote_description_set: false,
            signals,
            events,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn remote_peer(&self) -> Option<ConnectionId> {
        self.remote_peer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn local_tracks(&self) -> &[T::Track] {
        &self.local_tracks
    }

    pub fn buffered_remote_candidates(&self) -> usize {
        self.pending_remote_candidates.len()
    }

    pub fn queued_local_candidates(&self) -> usize {
        self.pending_local_candidates.len()
    }

    /// Caller side: acquire media, attach it, send an offer to `to`.
    ///
    /// On failure the session stays `Idle` and every acquired track is
    /// stopped.
    pub async fn start_call<D>(
        &mut self,
        devices: &D,
        constraints: MediaConstraints,
        to: ConnectionId,
    ) -> Result<(), NegotiationError>
    where
        D: MediaDevices<Track = T::Track>,
    {
        self.expect_state(NegotiationState::Idle)?;

        let result = self.offer(devices, constraints, to).await;
        if result.is_err() {
            self.abandon_attempt().await;
        }
        result
    }

    async fn offer<D>(
        &mut self,
        devices: &D,
        constraints: MediaConstraints,
        to: ConnectionId,
    ) -> Result<(), NegotiationError>
    where
        D: MediaDevices<Track = T::Track>,
    {
        self.attach_local_media(devices, constraints).await?;
        self.set_remote_peer(to)?;

        let offer = self.transport.create_offer().await?;
        self.send(ClientSignal::CallOffer { to, offer })?;

        info!("Offer sent to {}", to);
        self.transition(NegotiationState::OfferSent);
        Ok(())
    }

    /// Callee side: take the offer from `from` and answer it.
    pub async fn accept_call<D>(
        &mut self,
        devices: &D,
        constraints: MediaConstraints,
        from: ConnectionId,
        offer: Descriptor,
    ) -> Result<(), NegotiationError>
    where
        D: MediaDevices<Track = T::Track>,
    {
        self.expect_state(NegotiationState::Idle)?;

        let result = self.answer(devices, constraints, from, offer).await;
        if result.is_err() {
            self.abandon_attempt().await;
        }
        result
    }

    async fn answer<D>(
        &mut self,
        devices: &D,
        constraints: MediaConstraints,
        from: ConnectionId,
        offer: Descriptor,
    ) -> Result<(), NegotiationError>
    where
        D: MediaDevices<Track = T::Track>,
    {
        self.set_remote_peer(from)?;
        self.attach_local_media(devices, constraints).await?;
        self.apply_remote_description(offer).await?;

        let answer = self.transport.create_answer().await?;
        self.send(ClientSignal::CallAccepted { to: from, answer })?;

        info!("Answer sent to {}", from);
        self.transition(NegotiationState::AnswerSent);
        self.transition(NegotiationState::Connected);
        Ok(())
    }

    /// Caller side: the callee's answer arrived.
    pub async fn apply_answer(&mut self, answer: Descriptor) -> Result<(), NegotiationError> {
        self.expect_state(NegotiationState::OfferSent)?;

        self.apply_remote_description(answer).await?;
        self.transition(NegotiationState::Connected);
        Ok(())
    }

    /// Records who the candidates are for and sends everything queued so far.
    pub fn set_remote_peer(&mut self, id: ConnectionId) -> Result<(), NegotiationError> {
        self.remote_peer = Some(id);

        while let Some(candidate) = self.pending_local_candidates.pop_front() {
            self.send(ClientSignal::IceCandidate { to: id, candidate })?;
        }
        Ok(())
    }

    pub fn on_transport_event(
        &mut self,
        event: TransportEvent<T::RemoteTrack>,
    ) -> Result<(), NegotiationError> {
        match event {
            TransportEvent::LocalCandidate(candidate) => {
                if self.state == NegotiationState::Closed {
                    return Ok(());
                }
                match self.remote_peer {
                    Some(to) => self.send(ClientSignal::IceCandidate { to, candidate })?,
                    None => self.pending_local_candidates.push_back(candidate),
                }
            }

            TransportEvent::TrackArrived(track) => {
                let _ = self.events.send(SessionEvent::RemoteTrack(track));
            }

            TransportEvent::ConnectionStateChanged(state) => {
                debug!("Transport state is now {:?}", state);
                let _ = self.events.send(SessionEvent::ConnectionStateChanged(state));
            }
        }
        Ok(())
    }

    /// Applies a candidate from the remote peer, or buffers it until the
    /// remote description is known. A candidate the transport rejects is
    /// logged and skipped.
    pub async fn add_remote_candidate(&mut self, candidate: Descriptor) {
        if self.state == NegotiationState::Closed {
            debug!("Ignoring remote candidate on closed session");
            return;
        }

        if !self.remote_description_set {
            self.pending_remote_candidates.push_back(candidate);
            return;
        }

        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate: {:#}", e);
        }
    }

    /// Swaps the outgoing track of the same kind without a new offer and
    /// hands back the one it displaced, still live, so it can be swapped in
    /// again later. `None` when nothing of that kind is being sent.
    pub async fn replace_track(
        &mut self,
        track: T::Track,
    ) -> Result<Option<T::Track>, NegotiationError> {
        self.expect_state(NegotiationState::Connected)?;

        if !self.transport.replace_track(&track).await? {
            return Ok(None);
        }

        let id = track.id();
        let kind = track.kind();
        self.displaced_tracks.retain(|t| t.id() != id);

        let previous = match self.local_tracks.iter_mut().find(|t| t.kind() == kind) {
            Some(slot) => Some(std::mem::replace(slot, track)),
            None => {
                self.local_tracks.push(track);
                None
            }
        };

        // Kept so close still stops it if the owner never does.
        if let Some(previous) = &previous {
            self.displaced_tracks.push(previous.clone());
        }
        Ok(previous)
    }

    pub fn set_media_enabled(&self, kind: MediaKind, enabled: bool) {
        for track in self.local_tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
        }
    }

    /// Stops local media and closes the transport. Calling it again does
    /// nothing.
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }

        self.stop_local_tracks();
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {:#}", e);
        }

        self.pending_local_candidates.clear();
        self.pending_remote_candidates.clear();
        self.remote_description_set = false;

        info!("Session closed");
        self.transition(NegotiationState::Closed);
    }

    async fn attach_local_media<D>(
        &mut self,
        devices: &D,
        constraints: MediaConstraints,
    ) -> Result<(), NegotiationError>
    where
        D: MediaDevices<Track = T::Track>,
    {
        let tracks = devices
            .acquire(constraints)
            .await
            .map_err(NegotiationError::MediaAcquisition)?;

        // Owned by the session from here on so a failed attach still stops them.
        self.local_tracks = tracks;
        self.attached_tracks = 0;
        for track in &self.local_tracks {
            self.transport.add_track(track).await?;
            self.attached_tracks += 1;
        }

        let _ = self
            .events
            .send(SessionEvent::LocalTracks(self.local_tracks.clone()));
        Ok(())
    }

    async fn apply_remote_description(
        &mut self,
        description: Descriptor,
    ) -> Result<(), NegotiationError> {
        self.transport.set_remote_description(description).await?;
        self.remote_description_set = true;

        if !self.pending_remote_candidates.is_empty() {
            debug!(
                "Flushing {} buffered remote candidate(s)",
                self.pending_remote_candidates.len()
            );
        }
        while let Some(candidate) = self.pending_remote_candidates.pop_front() {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate: {:#}", e);
            }
        }
        Ok(())
    }

    async fn abandon_attempt(&mut self) {
        for track in &self.local_tracks[..self.attached_tracks] {
            if let Err(e) = self.transport.remove_track(track).await {
                warn!("Failed to detach track {}: {:#}", track.id(), e);
            }
        }
        self.attached_tracks = 0;

        self.stop_local_tracks();
        self.remote_peer = None;
        self.pending_local_candidates.clear();
        self.pending_remote_candidates.clear();
        self.remote_description_set = false;
    }

    fn stop_local_tracks(&mut self) {
        for track in self.local_tracks.drain(..).chain(self.displaced_tracks.drain(..)) {
            track.stop();
        }
    }

    fn expect_state(&self, expected: NegotiationState) -> Result<(), NegotiationError> {
        if self.state != expected {
            return Err(NegotiationError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn send(&self, signal: ClientSignal) -> Result<(), NegotiationError> {
        self.signals
            .send(signal)
            .map_err(|_| NegotiationError::SignalingClosed)
    }

    fn transition(&mut self, next: NegotiationState) {
        debug!("Negotiation {} -> {}", self.state, next);
        self.state = next;
        let _ = self.events.send(SessionEvent::StateChanged(next));
    }
}

impl<T: MediaTransport> Drop for NegotiationSession<T> {
    fn drop(&mut self) {
        if self.state != NegotiationState::Closed {
            self.stop_local_tracks();
        }
    }
}
