use tandem_client::TransportEvent;
use tandem_core::{ClientSignal, ConnectionId};

use crate::integration::{create_test_session, drain, init_tracing};
use crate::utils::candidate;

#[tokio::test]
async fn test_local_candidates_wait_for_remote_peer() {
    init_tracing();

    let mut t = create_test_session();
    let peer = ConnectionId::new();

    t.session
        .on_transport_event(TransportEvent::LocalCandidate(candidate(1)))
        .expect("queue candidate 1");
    t.session
        .on_transport_event(TransportEvent::LocalCandidate(candidate(2)))
        .expect("queue candidate 2");

    assert_eq!(t.session.queued_local_candidates(), 2);
    assert!(drain(&mut t.signals).is_empty());

    t.session.set_remote_peer(peer).expect("set_remote_peer");
    t.session
        .on_transport_event(TransportEvent::LocalCandidate(candidate(3)))
        .expect("send candidate 3");

    assert_eq!(t.session.queued_local_candidates(), 0);
    assert_eq!(
        drain(&mut t.signals),
        (1..=3)
            .map(|n| ClientSignal::IceCandidate {
                to: peer,
                candidate: candidate(n),
            })
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_closed_signaling_channel_is_reported() {
    init_tracing();

    let mut t = create_test_session();
    t.session.set_remote_peer(ConnectionId::new()).expect("set_remote_peer");
    t.signals.close();

    let result = t
        .session
        .on_transport_event(TransportEvent::LocalCandidate(candidate(1)));

    assert!(matches!(
        result,
        Err(tandem_client::NegotiationError::SignalingClosed)
    ));
}
