use crate::common::mocks::MockMediaHost;
use crate::common::{TestSession, buffering, playing, settle};
use playback_surface::Config;
use playback_surface::events::{EventFilter, EventPayload, EventType};
use playback_surface::player::{FullscreenRequest, PlaybackState};
use playback_surface::utils::HostError;

#[tokio::test(start_paused = true)]
async fn test_fullscreen_requests_follow_presentation() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    let mut requests = session
        .handle
        .subscribe_filtered(EventFilter::new().with_types(vec![EventType::Fullscreen]));

    session.handle.toggle_fullscreen().await.unwrap();
    let event = requests.recv().await.unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::Fullscreen(FullscreenRequest::Enter)
    ));
    assert_eq!(event.session_id, session.handle.session_id());

    // The request is only a request until the presentation confirms it
    session.handle.toggle_fullscreen().await.unwrap();
    assert!(matches!(
        requests.recv().await.unwrap().payload,
        EventPayload::Fullscreen(FullscreenRequest::Enter)
    ));

    session.handle.set_fullscreen(true).unwrap();
    let snapshot = session.handle.toggle_fullscreen().await.unwrap();
    assert!(snapshot.in_fullscreen);
    assert!(matches!(
        requests.recv().await.unwrap().payload,
        EventPayload::Fullscreen(FullscreenRequest::Exit)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_status_is_forwarded_before_snapshot() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    let mut events = session.handle.subscribe_filtered(
        EventFilter::new().with_types(vec![EventType::Status, EventType::Snapshot]),
    );

    session.report(buffering(30_000)).await;

    match events.recv().await.unwrap().payload {
        EventPayload::Status(status) => {
            assert!(status.is_buffering);
            assert_eq!(status.position_millis, Some(30_000));
        }
        other => panic!("expected status, got {:?}", other),
    }
    match events.recv().await.unwrap().payload {
        EventPayload::Snapshot(snapshot) => {
            assert_eq!(snapshot.playback_state, PlaybackState::Buffering);
            assert_eq!(snapshot.position_label, "0:30");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_spinner_timer_publishes_snapshot() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    session.report(buffering(10_000)).await;

    let mut snapshots = session
        .handle
        .subscribe_filtered(EventFilter::new().with_types(vec![EventType::Snapshot]));
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let event = snapshots.try_recv().expect("spinner snapshot");
    match event.payload {
        EventPayload::Snapshot(snapshot) => assert!(snapshot.spinner_visible),
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_errors_reach_channel_and_bus() {
    let mut session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    let mut errors = session
        .handle
        .subscribe_filtered(EventFilter::new().with_types(vec![EventType::Error]));
    session.host.inject_error(HostError::Rejected("busy".into()));

    session.handle.toggle_controls().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    session.handle.toggle_play_pause().await.unwrap();
    settle().await;

    let from_channel = session.drain_errors();
    assert_eq!(from_channel.len(), 1);
    assert!(!from_channel[0].is_fatal());

    match errors.recv().await.unwrap().payload {
        EventPayload::Error(error) => assert_eq!(error, from_channel[0]),
        other => panic!("expected error, got {:?}", other),
    }

    // The failure leaves the session usable
    session.host.clear_error();
    session.report(playing(12_000)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().playback_state,
        PlaybackState::Playing
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_publishes_closed() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    let mut events = session
        .handle
        .subscribe_filtered(EventFilter::new().with_types(vec![EventType::Closed]));

    session.handle.shutdown().await.unwrap();

    let event = events.recv().await.unwrap();
    assert!(matches!(event.payload, EventPayload::Closed));
    assert_eq!(
        serde_json::to_value(&event).unwrap()["payload"]["type"],
        "Closed"
    );
}
