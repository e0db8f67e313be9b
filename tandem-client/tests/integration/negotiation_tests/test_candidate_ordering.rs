use tandem_client::MediaConstraints;
use tandem_core::ConnectionId;

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{MockDevices, TransportCall, candidate, mock_answer, mock_offer};

#[tokio::test]
async fn test_candidates_before_answer_are_flushed_in_order() {
    init_tracing();

    let mut t = create_test_session();
    t.session
        .start_call(&MockDevices::new(), MediaConstraints::default(), ConnectionId::new())
        .await
        .expect("start_call failed");

    for n in 1..=3 {
        t.session.add_remote_candidate(candidate(n)).await;
    }
    assert_eq!(t.session.buffered_remote_candidates(), 3);
    assert!(t.transport.applied_candidates().await.is_empty());

    t.session
        .apply_answer(mock_answer())
        .await
        .expect("apply_answer failed");
    t.session.add_remote_candidate(candidate(4)).await;

    assert_eq!(t.session.buffered_remote_candidates(), 0);
    assert_eq!(
        t.transport.applied_candidates().await,
        vec![candidate(1), candidate(2), candidate(3), candidate(4)]
    );

    // Nothing is applied ahead of the remote description.
    let calls = t.transport.calls().await;
    let description_at = calls
        .iter()
        .position(|c| matches!(c, TransportCall::SetRemoteDescription(_)))
        .expect("remote description never set");
    let first_candidate_at = calls
        .iter()
        .position(|c| matches!(c, TransportCall::AddIceCandidate(_)))
        .expect("no candidate applied");
    assert!(description_at < first_candidate_at);
}

#[tokio::test]
async fn test_candidates_before_offer_are_flushed_on_accept() {
    init_tracing();

    let mut t = create_test_session();

    // Candidates that overtake the offer wait in the buffer.
    t.session.add_remote_candidate(candidate(1)).await;
    t.session.add_remote_candidate(candidate(2)).await;

    t.session
        .accept_call(
            &MockDevices::new(),
            MediaConstraints::default(),
            ConnectionId::new(),
            mock_offer(),
        )
        .await
        .expect("accept_call failed");

    let calls = t.transport.calls().await;
    let tail: Vec<_> = calls
        .iter()
        .skip_while(|c| !matches!(c, TransportCall::SetRemoteDescription(_)))
        .cloned()
        .collect();
    assert_eq!(
        tail,
        vec![
            TransportCall::SetRemoteDescription(mock_offer()),
            TransportCall::AddIceCandidate(candidate(1)),
            TransportCall::AddIceCandidate(candidate(2)),
            TransportCall::CreateAnswer,
        ]
    );
}
