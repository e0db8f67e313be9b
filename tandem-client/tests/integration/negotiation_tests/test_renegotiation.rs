use tandem_client::{MediaConstraints, MediaKind, MediaTrack, NegotiationState};
use tandem_core::ConnectionId;

use crate::integration::{create_test_session, drain, init_tracing};
use crate::utils::{MockDevices, MockTrack, TransportCall, mock_offer};

#[tokio::test]
async fn test_replace_track_keeps_connected_state() {
    init_tracing();

    let mut t = create_test_session();
    let devices = MockDevices::new();
    t.session
        .accept_call(
            &devices,
            MediaConstraints::default(),
            ConnectionId::new(),
            mock_offer(),
        )
        .await
        .expect("accept_call failed");
    drain(&mut t.signals);
    let calls_before = t.transport.calls().await.len();

    let screen = MockTrack::new("screen", MediaKind::Video);
    let replaced = t
        .session
        .replace_track(screen.clone())
        .await
        .expect("replace_track failed");

    assert_eq!(replaced.map(|track| track.id()), Some("cam-0".to_string()));
    assert_eq!(t.session.state(), NegotiationState::Connected);

    // No new offer or answer.
    let calls = t.transport.calls().await;
    assert_eq!(&calls[calls_before..], &[TransportCall::ReplaceTrack("screen".into())]);
    assert!(drain(&mut t.signals).is_empty());

    let camera = devices
        .issued()
        .await
        .into_iter()
        .find(|track| track.kind() == MediaKind::Video)
        .expect("no camera issued");
    assert!(!camera.is_stopped());
    assert!(!screen.is_stopped());
    assert!(t.session.local_tracks().iter().any(|track| track.id() == "screen"));
}

#[tokio::test]
async fn test_screen_share_reverts_to_camera() {
    init_tracing();

    let mut t = create_test_session();
    t.session
        .accept_call(
            &MockDevices::new(),
            MediaConstraints::default(),
            ConnectionId::new(),
            mock_offer(),
        )
        .await
        .expect("accept_call failed");

    let screen = MockTrack::new("screen", MediaKind::Video);
    let camera = t
        .session
        .replace_track(screen.clone())
        .await
        .expect("replace_track failed")
        .expect("no camera was being sent");

    // Screen share ended, the camera goes back on.
    let ended = t
        .session
        .replace_track(camera.clone())
        .await
        .expect("replace_track failed")
        .expect("no screen was being sent");
    assert_eq!(ended.id(), "screen");
    ended.stop();

    assert!(!camera.is_stopped());
    assert_eq!(
        t.transport.attached_tracks().await,
        vec!["mic-0".to_string(), "cam-0".to_string()]
    );
    assert_eq!(t.session.state(), NegotiationState::Connected);

    t.session.close().await;
    assert!(camera.is_stopped());
}

#[tokio::test]
async fn test_close_stops_displaced_tracks() {
    init_tracing();

    let mut t = create_test_session();
    let devices = MockDevices::new();
    t.session
        .accept_call(
            &devices,
            MediaConstraints::default(),
            ConnectionId::new(),
            mock_offer(),
        )
        .await
        .expect("accept_call failed");

    let screen = MockTrack::new("screen", MediaKind::Video);
    t.session
        .replace_track(screen.clone())
        .await
        .expect("replace_track failed");

    t.session.close().await;

    assert!(screen.is_stopped());
    assert!(devices.issued().await.iter().all(|track| track.is_stopped()));
}

#[tokio::test]
async fn test_replace_track_without_matching_sender() {
    init_tracing();

    let mut t = create_test_session();
    t.session
        .accept_call(
            &MockDevices::new(),
            MediaConstraints {
                audio: true,
                video: false,
            },
            ConnectionId::new(),
            mock_offer(),
        )
        .await
        .expect("accept_call failed");

    let replaced = t
        .session
        .replace_track(MockTrack::new("screen", MediaKind::Video))
        .await
        .expect("replace_track failed");

    assert!(replaced.is_none());
    assert_eq!(t.session.local_tracks().len(), 1);
}

#[tokio::test]
async fn test_mute_toggles_only_one_kind() {
    init_tracing();

    let mut t = create_test_session();
    t.session
        .accept_call(
            &MockDevices::new(),
            MediaConstraints::default(),
            ConnectionId::new(),
            mock_offer(),
        )
        .await
        .expect("accept_call failed");

    t.session.set_media_enabled(MediaKind::Audio, false);

    for track in t.session.local_tracks() {
        assert_eq!(track.is_enabled(), track.kind() == MediaKind::Video);
    }
}
