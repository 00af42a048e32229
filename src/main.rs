use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use playback_surface::Config;
use playback_surface::events::{EventFilter, EventPayload, EventType};
use playback_surface::player::{
    MediaSource, PlaybackState, PlayerController, PlayerHandle, SimulatedMedia,
};

const DEMO_DURATION: Duration = Duration::from_secs(12);
const STATUS_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("playback_surface=debug")),
        )
        .init();

    info!("Starting playback surface demo");

    let config = Config::load().context("Failed to load configuration")?;
    let uri = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sim://big-buck-bunny.m3u8".to_string());

    let media = Arc::new(SimulatedMedia::new(DEMO_DURATION, true));
    let handle = PlayerController::spawn(media.clone(), Some(MediaSource::new(uri)), config)
        .context("Failed to start playback session")?;

    let token = CancellationToken::new();
    let driver = media.drive(handle.clone(), STATUS_INTERVAL, token.clone());
    let observer = tokio::spawn(observe(handle.clone()));

    if let Some(mut errors) = handle.take_error_receiver() {
        tokio::spawn(async move {
            while let Some(e) = errors.recv().await {
                error!("Player error: {}", e);
            }
        });
    }

    tokio::select! {
        result = script(&handle) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    token.cancel();
    handle.shutdown().await?;
    let _ = driver.await;
    let _ = observer.await;

    info!("Demo finished");
    Ok(())
}

/// Log every snapshot and fullscreen request as JSON
async fn observe(handle: PlayerHandle) {
    let mut events = handle.subscribe_filtered(EventFilter::new().with_types(vec![
        EventType::Snapshot,
        EventType::Fullscreen,
        EventType::Closed,
    ]));

    while let Some(event) = events.recv().await {
        if matches!(event.payload, EventPayload::Closed) {
            break;
        }
        match serde_json::to_string(&event.payload) {
            Ok(json) => info!("{}", json),
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
    }
}

/// A short sequence of gestures exercising the control surface
async fn script(handle: &PlayerHandle) -> Result<()> {
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.toggle_controls().await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.toggle_play_pause().await?;

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.toggle_play_pause().await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.begin_seek().await?;
    handle.complete_seek(0.5).await?;

    handle.toggle_fullscreen().await?;
    handle.set_fullscreen(true)?;

    // Wait for the end of the clip, then watch it again from the start
    loop {
        tokio::time::sleep(STATUS_INTERVAL).await;
        if handle.snapshot().await?.playback_state == PlaybackState::Ended {
            break;
        }
    }
    info!("Clip ended, replaying");
    handle.replay().await?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    Ok(())
}
