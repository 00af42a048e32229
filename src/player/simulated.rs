use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::controller::PlayerHandle;
use super::traits::MediaHost;
use super::types::{AudioMode, MediaSource, PlaybackStatus, StatusChange};
use crate::utils::HostError;

/// How long the simulated stream buffers after a seek while playing
const SEEK_REBUFFER: Duration = Duration::from_millis(350);

#[derive(Debug)]
struct SimulatedState {
    source: Option<MediaSource>,
    position_ms: u64,
    should_play: bool,
    buffering_until: Option<Instant>,
    just_finished: bool,
    last_tick: Instant,
}

/// In-process media host that advances a virtual clock instead of decoding.
///
/// Used by the demo binary; it answers commands like a real host and pushes
/// periodic status updates through [`SimulatedMedia::drive`].
#[derive(Debug)]
pub struct SimulatedMedia {
    duration_ms: u64,
    autoplay: bool,
    state: Mutex<SimulatedState>,
}

impl SimulatedMedia {
    pub fn new(duration: Duration, autoplay: bool) -> Self {
        Self {
            duration_ms: duration.as_millis() as u64,
            autoplay,
            state: Mutex::new(SimulatedState {
                source: None,
                position_ms: 0,
                should_play: false,
                buffering_until: None,
                just_finished: false,
                last_tick: Instant::now(),
            }),
        }
    }

    /// Advance the virtual clock to now and return the resulting status
    pub async fn tick(&self) -> PlaybackStatus {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_tick);
        state.last_tick = now;

        if state.buffering_until.is_some_and(|until| now >= until) {
            trace!("Simulated buffering finished");
            state.buffering_until = None;
        }

        if state.source.is_some() && state.should_play && state.buffering_until.is_none() {
            state.position_ms = state.position_ms.saturating_add(elapsed.as_millis() as u64);
            if state.position_ms >= self.duration_ms {
                state.position_ms = self.duration_ms;
                state.should_play = false;
                state.just_finished = true;
                info!("Simulated playback reached the end");
            }
        }

        let status = self.status(&state);
        state.just_finished = false;
        status
    }

    /// Push a status every `interval` until the session closes or `token` is cancelled
    pub fn drive(
        self: std::sync::Arc<Self>,
        handle: PlayerHandle,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let status = self.tick().await;
                        if handle.report_status(status).is_err() {
                            debug!("Session closed, stopping simulated media");
                            break;
                        }
                    }
                }
            }
        })
    }

    fn status(&self, state: &SimulatedState) -> PlaybackStatus {
        let buffering = state.buffering_until.is_some();
        PlaybackStatus {
            is_loaded: state.source.is_some(),
            is_playing: state.should_play && !buffering,
            is_buffering: state.should_play && buffering,
            position_millis: Some(state.position_ms),
            duration_millis: Some(self.duration_ms),
            should_play: state.should_play,
            did_just_finish: state.just_finished,
            is_looping: false,
            error: None,
        }
    }
}

#[async_trait]
impl MediaHost for SimulatedMedia {
    async fn load(&self, source: &MediaSource) -> Result<PlaybackStatus, HostError> {
        let mut state = self.state.lock().await;
        info!("Simulated load of {}", source.uri);
        state.source = Some(source.clone());
        state.position_ms = 0;
        state.should_play = self.autoplay;
        state.last_tick = Instant::now();
        Ok(self.status(&state))
    }

    async fn set_status(&self, change: StatusChange) -> Result<PlaybackStatus, HostError> {
        let mut state = self.state.lock().await;
        if state.source.is_none() {
            return Err(HostError::NotLoaded);
        }

        if let Some(position) = change.position_millis {
            if position > self.duration_ms {
                return Err(HostError::Rejected(format!(
                    "position {}ms beyond duration {}ms",
                    position, self.duration_ms
                )));
            }
            state.position_ms = position;
            state.buffering_until = Some(Instant::now() + SEEK_REBUFFER);
        }
        if let Some(should_play) = change.should_play {
            state.should_play = should_play;
        }
        state.last_tick = Instant::now();

        Ok(self.status(&state))
    }

    async fn configure_audio(&self, mode: &AudioMode) -> Result<(), HostError> {
        debug!("Simulated audio mode: {:?}", mode);
        Ok(())
    }
}
