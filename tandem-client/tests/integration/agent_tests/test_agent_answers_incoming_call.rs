use tandem_client::{AgentEvent, NegotiationState, SessionEvent};
use tandem_core::{ClientSignal, ConnectionId, RelaySignal};

use super::spawn_local_agent;
use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT_MS, candidate, eventually, mock_answer, mock_offer, wait_for_event};

#[tokio::test]
async fn test_agent_answers_incoming_call() {
    init_tracing();

    let mut a = spawn_local_agent();
    let me = ConnectionId::new();
    let caller = ConnectionId::new();

    a.relay
        .send(RelaySignal::Welcome {
            id: me,
            ice_servers: vec![],
        })
        .unwrap();
    let welcomed = wait_for_event(&mut a.events, |_| true).await.unwrap();
    assert!(matches!(welcomed, AgentEvent::Welcomed { id } if id == me));

    a.relay
        .send(RelaySignal::IncomingCall {
            from: caller,
            offer: mock_offer(),
        })
        .unwrap();

    let incoming = wait_for_event(&mut a.events, |_| true).await.unwrap();
    assert!(matches!(incoming, AgentEvent::IncomingCall { from } if from == caller));
    wait_for_event(&mut a.events, |e| {
        matches!(
            e,
            AgentEvent::Session(SessionEvent::StateChanged(NegotiationState::Connected))
        )
    })
    .await
    .expect("callee never reached Connected");

    let answer = tokio::time::timeout(
        std::time::Duration::from_millis(EVENT_TIMEOUT_MS),
        a.outgoing.recv(),
    )
    .await
    .expect("no answer sent")
    .expect("signal channel closed");
    assert_eq!(
        answer,
        ClientSignal::CallAccepted {
            to: caller,
            answer: mock_answer(),
        }
    );

    // A stranger's candidate is dropped, the caller's is applied.
    a.relay
        .send(RelaySignal::IceCandidate {
            from: ConnectionId::new(),
            candidate: candidate(1),
        })
        .unwrap();
    a.relay
        .send(RelaySignal::IceCandidate {
            from: caller,
            candidate: candidate(2),
        })
        .unwrap();

    let transport = a.factory.transport(0).await.expect("no transport created");
    let applied = eventually(|| {
        let transport = transport.clone();
        async move { !transport.applied_candidates().await.is_empty() }
    })
    .await;
    assert!(applied);
    assert_eq!(transport.applied_candidates().await, vec![candidate(2)]);
}

#[tokio::test]
async fn test_agent_stays_busy_during_call() {
    init_tracing();

    let mut a = spawn_local_agent();
    let caller = ConnectionId::new();

    a.relay
        .send(RelaySignal::IncomingCall {
            from: caller,
            offer: mock_offer(),
        })
        .unwrap();
    wait_for_event(&mut a.events, |e| {
        matches!(
            e,
            AgentEvent::Session(SessionEvent::StateChanged(NegotiationState::Connected))
        )
    })
    .await
    .expect("first call never connected");

    a.relay
        .send(RelaySignal::IncomingCall {
            from: ConnectionId::new(),
            offer: mock_offer(),
        })
        .unwrap();
    a.handle.shutdown().await.expect("agent already stopped");

    wait_for_event(&mut a.events, |e| matches!(e, AgentEvent::CallEnded))
        .await
        .expect("call never ended");
    assert_eq!(a.factory.created().await, 1);
}
