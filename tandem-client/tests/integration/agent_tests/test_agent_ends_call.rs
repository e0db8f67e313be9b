use tandem_client::{
    AgentEvent, CallAgent, MediaError, NegotiationState, PeerConnectionState, SessionEvent,
    TransportEvent,
};
use tandem_core::{ClientSignal, ConnectionId, RelaySignal};
use tokio::sync::mpsc;

use super::{LocalAgent, spawn_local_agent};
use crate::integration::init_tracing;
use crate::utils::{
    MockDevices, MockTransportFactory, eventually, mock_answer, mock_offer, wait_for_event,
};

/// Places a call to a fresh callee and lets it get answered.
async fn connected_caller() -> (LocalAgent, ConnectionId) {
    let mut a = spawn_local_agent();
    let callee = ConnectionId::new();

    a.handle.call(callee).await.expect("agent stopped");
    let offer = a.outgoing.recv().await.expect("no offer sent");
    assert_eq!(
        offer,
        ClientSignal::CallOffer {
            to: callee,
            offer: mock_offer(),
        }
    );

    a.relay
        .send(RelaySignal::CallAccepted {
            from: callee,
            answer: mock_answer(),
        })
        .unwrap();
    wait_for_event(&mut a.events, |e| {
        matches!(
            e,
            AgentEvent::Session(SessionEvent::StateChanged(NegotiationState::Connected))
        )
    })
    .await
    .expect("caller never connected");

    (a, callee)
}

#[tokio::test]
async fn test_peer_left_ends_call() {
    init_tracing();

    let (mut a, callee) = connected_caller().await;

    // Someone else leaving does not end the call.
    let bystander = ConnectionId::new();
    a.relay.send(RelaySignal::PeerLeft { id: bystander }).unwrap();
    a.relay.send(RelaySignal::PeerLeft { id: callee }).unwrap();

    let left = wait_for_event(&mut a.events, |e| matches!(e, AgentEvent::PeerLeft { .. }))
        .await
        .unwrap();
    assert!(matches!(left, AgentEvent::PeerLeft { id } if id == bystander));

    let next = wait_for_event(&mut a.events, |e| {
        matches!(e, AgentEvent::PeerLeft { .. } | AgentEvent::CallEnded)
    })
    .await
    .unwrap();
    assert!(matches!(next, AgentEvent::PeerLeft { id } if id == callee));
    wait_for_event(&mut a.events, |e| matches!(e, AgentEvent::CallEnded))
        .await
        .expect("call never ended");

    let transport = a.factory.transport(0).await.unwrap();
    assert_eq!(transport.close_count().await, 1);
    assert!(a.devices.issued().await.iter().all(|t| t.is_stopped()));
}

#[tokio::test]
async fn test_transport_failure_ends_call() {
    init_tracing();

    let (mut a, _callee) = connected_caller().await;

    assert!(
        a.factory
            .inject(
                0,
                TransportEvent::ConnectionStateChanged(PeerConnectionState::Failed)
            )
            .await
    );

    wait_for_event(&mut a.events, |e| {
        matches!(
            e,
            AgentEvent::Session(SessionEvent::ConnectionStateChanged(
                PeerConnectionState::Failed
            ))
        )
    })
    .await
    .expect("state change never surfaced");
    wait_for_event(&mut a.events, |e| matches!(e, AgentEvent::CallEnded))
        .await
        .expect("call never ended");

    let transport = a.factory.transport(0).await.unwrap();
    assert!(eventually(|| {
        let transport = transport.clone();
        async move { transport.close_count().await == 1 }
    })
    .await);
}

#[tokio::test]
async fn test_end_call_then_call_again() {
    init_tracing();

    let (mut a, _callee) = connected_caller().await;

    a.handle.end_call().await.unwrap();
    wait_for_event(&mut a.events, |e| matches!(e, AgentEvent::CallEnded))
        .await
        .expect("call never ended");

    let next = ConnectionId::new();
    a.handle.call(next).await.unwrap();
    let offer = a.outgoing.recv().await.expect("no second offer");
    assert!(matches!(offer, ClientSignal::CallOffer { to, .. } if to == next));
    assert_eq!(a.factory.created().await, 2);
}

#[tokio::test]
async fn test_media_failure_reports_call_failed() {
    init_tracing();

    let factory = MockTransportFactory::new();
    let (signals_tx, mut outgoing) = mpsc::unbounded_channel();
    let (_relay, relay_rx) = mpsc::unbounded_channel();
    let (agent, handle, mut events) = CallAgent::new(
        factory.clone(),
        MockDevices::failing(MediaError::NotFound),
        signals_tx,
        relay_rx,
    );
    tokio::spawn(agent.run());

    handle.call(ConnectionId::new()).await.unwrap();

    let failed = wait_for_event(&mut events, |e| matches!(e, AgentEvent::CallFailed { .. }))
        .await
        .unwrap();
    assert!(matches!(failed, AgentEvent::CallFailed { reason } if reason.contains("no device")));
    assert!(outgoing.try_recv().is_err());

    let transport = factory.transport(0).await.unwrap();
    assert_eq!(transport.close_count().await, 1);

    // The agent survives the failure.
    handle.end_call().await.expect("agent stopped after a failed call");
}
