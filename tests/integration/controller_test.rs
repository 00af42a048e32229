use crate::common::mocks::{MockCall, MockMediaHost};
use crate::common::{TEST_URI, TestSession, buffering, finished, paused, playing, settle};
use playback_surface::Config;
use playback_surface::player::{
    CenterControl, ControlsState, MediaSource, PlaybackState, PlaybackStatus, PlayerController,
    SeekState, StatusChange,
};
use playback_surface::utils::{ControllerError, ErrorSeverity, HostError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test]
async fn test_missing_source_is_fatal() {
    let host = Arc::new(MockMediaHost::new());

    let error = PlayerController::new(host.clone(), None, Config::default())
        .err()
        .expect("missing source must fail");
    assert_eq!(error.severity, ErrorSeverity::Fatal);
    assert!(error.message.contains("source"));

    let empty = PlayerController::new(host.clone(), Some(MediaSource::new("  ")), Config::default());
    assert!(empty.is_err());
    assert!(host.calls().is_empty());
}

#[test]
fn test_controller_created_outside_runtime() {
    let host = Arc::new(MockMediaHost::new());
    let (handle, controller) = PlayerController::new(
        host.clone(),
        Some(MediaSource::new(TEST_URI)),
        Config::default(),
    )
    .expect("valid source");

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async move {
        let task = tokio::spawn(controller.run());
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.seek_state, SeekState::NotSeeking);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    });
}

#[tokio::test(start_paused = true)]
async fn test_start_configures_audio_then_loads() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    assert_eq!(
        session.host.calls(),
        vec![MockCall::ConfigureAudio, MockCall::Load(TEST_URI.to_string())]
    );

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
    assert_eq!(snapshot.position_ms, 10_000);
    assert_eq!(snapshot.duration_label, "1:40");
    assert_eq!(snapshot.controls_state, ControlsState::Hidden);
    assert!(!snapshot.spinner_visible);
}

#[tokio::test(start_paused = true)]
async fn test_audio_mode_failure_is_non_fatal() {
    let host = MockMediaHost::new().with_audio_error(HostError::Unavailable("no audio session".into()));
    let mut session = TestSession::start(host, Config::default()).await;

    let errors = session.drain_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, ErrorSeverity::NonFatal);

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_load_rejection_is_fatal() {
    let host = MockMediaHost::new().with_load_error(HostError::Rejected("404".into()));
    let mut session = TestSession::start(host, Config::default()).await;

    let errors = session.drain_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_fatal());

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Error);
    assert!(snapshot.error_message.unwrap().contains(TEST_URI));
    assert!(!snapshot.seek_bar_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_status_error_before_first_load_is_fatal() {
    let host = MockMediaHost::with_status(PlaybackStatus::default());
    let mut session = TestSession::start(host, Config::default()).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().playback_state,
        PlaybackState::Loading
    );

    session.report(PlaybackStatus::failed("decoder init failed")).await;

    let errors = session.drain_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_fatal());
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Error);
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("Encountered a fatal error during playback: decoder init failed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_state_follows_status_precedence() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    let both = PlaybackStatus {
        is_playing: true,
        ..buffering(12_000)
    };
    session.report(both).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().playback_state,
        PlaybackState::Playing
    );

    session.report(buffering(12_000)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().playback_state,
        PlaybackState::Buffering
    );

    session.report(paused(12_000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Paused);
    assert_eq!(snapshot.center_control, CenterControl::Play);
}

#[tokio::test(start_paused = true)]
async fn test_spinner_appears_only_after_debounce() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    session.report(buffering(10_000)).await;
    assert!(!session.handle.snapshot().await.unwrap().spinner_visible);

    sleep(ms(250)).await;
    assert!(session.handle.snapshot().await.unwrap().spinner_visible);
}

#[tokio::test(start_paused = true)]
async fn test_short_buffering_never_shows_spinner() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    let mut events = session.handle.subscribe();

    session.report(buffering(10_000)).await;
    sleep(ms(50)).await;
    session.report(playing(10_050)).await;
    sleep(ms(500)).await;

    while let Some(event) = events.try_recv() {
        if let playback_surface::events::EventPayload::Snapshot(snapshot) = event.payload {
            assert!(!snapshot.spinner_visible);
        }
    }
    assert_eq!(
        session.handle.snapshot().await.unwrap().playback_state,
        PlaybackState::Playing
    );
}

#[tokio::test(start_paused = true)]
async fn test_seek_drag_pauses_then_resumes() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    let snapshot = session.handle.begin_seek().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::Seeking);
    assert_eq!(snapshot.center_control, CenterControl::None);
    settle().await;
    assert_eq!(session.host.status_changes(), vec![StatusChange::pause()]);

    let snapshot = session.handle.complete_seek(0.5).await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::Seeked);
    assert_eq!(snapshot.playback_state, PlaybackState::Buffering);
    assert_eq!(snapshot.position_ms, 50_000);

    settle().await;
    assert_eq!(
        session.host.status_changes().last(),
        Some(&StatusChange::seek(50_000, true))
    );

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::NotSeeking);
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
    assert_eq!(snapshot.position_ms, 50_000);
}

#[tokio::test(start_paused = true)]
async fn test_seek_from_pause_stays_paused() {
    let session = TestSession::start(MockMediaHost::with_status(paused(0)), Config::default()).await;

    session.handle.begin_seek().await.unwrap();
    let snapshot = session.handle.complete_seek(0.2).await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Paused);

    settle().await;
    assert_eq!(
        session.host.status_changes().last(),
        Some(&StatusChange::seek(20_000, false))
    );
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Paused);
    assert_eq!(snapshot.seek_state, SeekState::NotSeeking);
}

#[tokio::test(start_paused = true)]
async fn test_failed_seek_returns_to_not_seeking() {
    let mut session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    session.host.inject_error(HostError::Rejected("stream closed".into()));

    session.handle.begin_seek().await.unwrap();
    session.handle.complete_seek(0.9).await.unwrap();
    settle().await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::NotSeeking);

    let errors = session.drain_errors();
    assert!(errors.iter().all(|e| !e.is_fatal()));
    assert!(errors.iter().any(|e| e.message.starts_with("Seek failed")));
}

#[tokio::test(start_paused = true)]
async fn test_status_ignored_until_seek_acknowledged() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;
    session.host.set_latency(ms(500));

    session.handle.tap_seek_bar(0.4).await.unwrap();
    sleep(ms(100)).await;

    // The pause issued for the tap arrives as a status before the seek ack
    session.report(paused(10_000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::Seeked);
    assert_eq!(snapshot.playback_state, PlaybackState::Buffering);

    // Pause and seek each take 500ms on the host
    sleep(ms(1000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::NotSeeking);
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
    assert_eq!(snapshot.position_ms, 40_000);
}

#[tokio::test(start_paused = true)]
async fn test_seek_bar_tap_ignored_while_loading() {
    let session = TestSession::start(
        MockMediaHost::with_status(PlaybackStatus::default()),
        Config::default(),
    )
    .await;

    let snapshot = session.handle.tap_seek_bar(0.5).await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::NotSeeking);
    assert!(!snapshot.seek_bar_enabled);
    settle().await;
    assert!(session.host.status_changes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_play_pause_tap_on_hidden_controls_only_reveals() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    let snapshot = session.handle.toggle_play_pause().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Showing);
    settle().await;
    assert!(session.host.status_changes().is_empty());

    sleep(ms(250)).await;
    let snapshot = session.handle.toggle_play_pause().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Shown);
    settle().await;
    assert_eq!(session.host.status_changes(), vec![StatusChange::pause()]);
}

#[tokio::test(start_paused = true)]
async fn test_controls_auto_hide_while_playing() {
    let session = TestSession::start_with_controls(MockMediaHost::new()).await;

    sleep(ms(3900)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Shown);
    assert_eq!(snapshot.controls_opacity, 1.0);

    sleep(ms(300)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().controls_state,
        ControlsState::Hiding
    );

    sleep(ms(1000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Hidden);
    assert_eq!(snapshot.controls_opacity, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_interaction_restarts_auto_hide() {
    let session = TestSession::start_with_controls(MockMediaHost::new()).await;

    sleep(ms(3000)).await;
    session.handle.reset_controls_timer().await.unwrap();

    sleep(ms(3000)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().controls_state,
        ControlsState::Shown
    );

    sleep(ms(1500)).await;
    assert_ne!(
        session.handle.snapshot().await.unwrap().controls_state,
        ControlsState::Shown
    );
}

#[tokio::test(start_paused = true)]
async fn test_seek_drag_keeps_controls_visible() {
    let session = TestSession::start_with_controls(MockMediaHost::new()).await;

    session.handle.begin_seek().await.unwrap();
    sleep(ms(1000)).await;
    session.handle.reset_controls_timer().await.unwrap();
    session.handle.toggle_fullscreen().await.unwrap();

    sleep(ms(6000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::Seeking);
    assert_eq!(snapshot.controls_state, ControlsState::Shown);
}

#[tokio::test(start_paused = true)]
async fn test_seek_ack_restarts_auto_hide() {
    let session = TestSession::start_with_controls(MockMediaHost::new()).await;

    session.handle.begin_seek().await.unwrap();
    session.handle.complete_seek(0.5).await.unwrap();
    settle().await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().seek_state,
        SeekState::NotSeeking
    );

    sleep(ms(3900)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().controls_state,
        ControlsState::Shown
    );

    sleep(ms(300)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().controls_state,
        ControlsState::Hiding
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_hide_suspended_while_paused() {
    let session = TestSession::start_with_controls(MockMediaHost::with_status(paused(0))).await;

    sleep(ms(6000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Shown);
    assert_eq!(snapshot.center_control, CenterControl::Play);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_controls_fades_linearly() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    session.handle.toggle_controls().await.unwrap();
    sleep(ms(100)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Showing);
    assert!((snapshot.controls_opacity - 0.5).abs() < 0.05);

    sleep(ms(150)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.controls_state, ControlsState::Shown);
    assert_eq!(snapshot.controls_opacity, 1.0);

    // Hiding on request uses the quick fade
    session.handle.toggle_controls().await.unwrap();
    sleep(ms(250)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().controls_state,
        ControlsState::Hidden
    );
}

#[tokio::test(start_paused = true)]
async fn test_ended_offers_replay() {
    let session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    session.report(finished()).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Ended);
    assert_eq!(snapshot.center_control, CenterControl::Replay);

    // Late statuses never leave Ended on their own
    session.report(paused(100_000)).await;
    assert_eq!(
        session.handle.snapshot().await.unwrap().playback_state,
        PlaybackState::Ended
    );

    let snapshot = session.handle.replay().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
    settle().await;
    assert_eq!(
        session.host.status_changes(),
        vec![StatusChange::seek(0, true)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_offline_buffering_shows_message() {
    let mut session = TestSession::start(MockMediaHost::new(), Config::default()).await;

    session.handle.set_connected(false).unwrap();
    session.report(buffering(20_000)).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Error);
    assert!(snapshot.error_message.unwrap().contains("offline"));
    assert!(session.drain_errors().is_empty());

    session.handle.set_connected(true).unwrap();
    session.report(playing(20_000)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
    assert_eq!(snapshot.error_message, None);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_session() {
    let session = TestSession::start_with_controls(MockMediaHost::new()).await;
    let calls_before = session.host.calls().len();

    session.handle.shutdown().await.unwrap();

    assert_eq!(
        session.handle.toggle_controls().await,
        Err(ControllerError::SessionClosed)
    );
    assert_eq!(
        session.handle.report_status(playing(0)),
        Err(ControllerError::SessionClosed)
    );
    assert!(session.handle.is_closed());

    // The pending hide timer never fires into a closed session
    sleep(ms(10_000)).await;
    assert_eq!(session.host.calls().len(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn test_controller_stops_when_handles_dropped() {
    let host = Arc::new(MockMediaHost::new());
    let (handle, controller) =
        PlayerController::new(host, Some(MediaSource::new(TEST_URI)), Config::default()).unwrap();
    let task = tokio::spawn(controller.run());

    settle().await;
    drop(handle);

    tokio::time::timeout(ms(100), task)
        .await
        .expect("controller should stop")
        .unwrap();
}
