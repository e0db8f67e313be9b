use tandem_client::{MediaConstraints, NegotiationState, SessionEvent};
use tandem_core::{ClientSignal, ConnectionId};

use crate::integration::{create_test_session, drain, init_tracing};
use crate::utils::{MockDevices, TransportCall, mock_answer, mock_offer};

#[tokio::test]
async fn test_callee_path() {
    init_tracing();

    let mut t = create_test_session();
    let devices = MockDevices::new();
    let caller = ConnectionId::new();

    t.session
        .accept_call(&devices, MediaConstraints::default(), caller, mock_offer())
        .await
        .expect("accept_call failed");

    assert_eq!(t.session.state(), NegotiationState::Connected);
    assert_eq!(t.session.remote_peer(), Some(caller));
    assert_eq!(
        drain(&mut t.signals),
        vec![ClientSignal::CallAccepted {
            to: caller,
            answer: mock_answer(),
        }]
    );

    assert_eq!(
        t.transport.calls().await,
        vec![
            TransportCall::AddTrack("mic-0".into()),
            TransportCall::AddTrack("cam-0".into()),
            TransportCall::SetRemoteDescription(mock_offer()),
            TransportCall::CreateAnswer,
        ]
    );

    let states: Vec<_> = drain(&mut t.events)
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![NegotiationState::AnswerSent, NegotiationState::Connected]
    );
}
