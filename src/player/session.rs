use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::types::{
    AudioMode, CenterControl, ControlsState, FullscreenRequest, MediaSource, PlaybackState,
    PlaybackStatus, SeekState, SessionSnapshot,
};
use crate::config::Config;
use crate::utils::{HostError, PlayerError, format_millis};

/// Identifies one scheduled timer, fade or seek request so that a completion
/// for something already superseded can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Auto-hide of the controls overlay
    HideControls,
    /// Debounce before the buffering spinner appears
    BufferingSpinner,
    /// Completion of the in-flight opacity fade
    Fade,
}

/// Command the controller must issue to the host media primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    Load(MediaSource),
    ConfigureAudio(AudioMode),
    /// Pause issued when a seek drag starts
    Pause,
    Seek {
        id: TimerId,
        position_ms: u64,
        should_play: bool,
    },
    SetPlaying(bool),
    /// Seek to the start and play
    Replay,
}

/// Result of a host request; `None` when the call has no status to report.
pub type HostOutcome = Result<Option<PlaybackStatus>, HostError>;

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Host(HostRequest),
    /// Replaces any pending timer of the same kind
    StartTimer {
        id: TimerId,
        kind: TimerKind,
        after: Duration,
    },
    CancelTimer(TimerKind),
    Report(PlayerError),
    Fullscreen(FullscreenRequest),
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    id: TimerId,
    from: f32,
    to: f32,
    duration: Duration,
    started_at: Instant,
}

impl Fade {
    fn opacity_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
        self.from + (self.to - self.from) * progress
    }
}

/// Playback, seek and controls state for one media session.
///
/// Transitions never perform I/O. Each one takes the current instant and
/// returns the effects the owner has to carry out; completions of those
/// effects come back through [`on_host_response`](Self::on_host_response)
/// and [`on_timer`](Self::on_timer).
#[derive(Debug)]
pub struct PlaybackSession {
    config: Config,

    playback_state: PlaybackState,
    seek_state: SeekState,
    controls_state: ControlsState,

    position_ms: u64,
    duration_ms: u64,
    should_play: bool,
    should_play_at_seek_end: bool,
    last_state_change: Instant,
    error_message: Option<String>,

    connected: bool,
    in_fullscreen: bool,
    has_loaded: bool,

    fade: Option<Fade>,
    hide_timer: Option<TimerId>,
    spinner_timer: Option<TimerId>,
    pending_seek: Option<TimerId>,
    next_id: u64,
}

impl PlaybackSession {
    pub fn new(config: Config, now: Instant) -> Self {
        let controls_state = if config.controls.show_controls_on_load {
            ControlsState::Shown
        } else {
            ControlsState::Hidden
        };

        Self {
            config,
            playback_state: PlaybackState::Loading,
            seek_state: SeekState::NotSeeking,
            controls_state,
            position_ms: 0,
            duration_ms: 0,
            should_play: false,
            should_play_at_seek_end: false,
            last_state_change: now,
            error_message: None,
            connected: true,
            in_fullscreen: false,
            has_loaded: false,
            fade: None,
            hide_timer: None,
            spinner_timer: None,
            pending_seek: None,
            next_id: 0,
        }
    }

    /// Effects that open the session: audio mode, source load and, when the
    /// controls start visible, their auto-hide timer.
    pub fn start(&mut self, source: MediaSource) -> Vec<Effect> {
        let mut effects = vec![
            Effect::Host(HostRequest::ConfigureAudio(self.config.audio.audio_mode())),
            Effect::Host(HostRequest::Load(source)),
        ];
        if self.controls_state == ControlsState::Shown {
            self.schedule_hide_timer(&mut effects);
        }
        effects
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state
    }

    pub fn seek_state(&self) -> SeekState {
        self.seek_state
    }

    pub fn controls_state(&self) -> ControlsState {
        self.controls_state
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn should_play_at_seek_end(&self) -> bool {
        self.should_play_at_seek_end
    }

    pub fn in_fullscreen(&self) -> bool {
        self.in_fullscreen
    }

    pub fn is_hide_timer_active(&self) -> bool {
        self.hide_timer.is_some()
    }

    // ---- host input ----

    pub fn on_status_update(&mut self, status: &PlaybackStatus, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        if !status.is_loaded {
            if let Some(error) = &status.error {
                let message = format!("Encountered a fatal error during playback: {}", error);
                // A source that never loaded is unusable; a later failure leaves
                // the session in place for recovery.
                let report = if self.has_loaded {
                    PlayerError::non_fatal(message.clone())
                } else {
                    PlayerError::fatal(message.clone())
                };
                self.enter_error(message, now, &mut effects);
                effects.push(Effect::Report(report));
            }
            return effects;
        }

        self.record_status(status);

        if self.seek_state != SeekState::NotSeeking || self.playback_state == PlaybackState::Ended
        {
            trace!(
                "Skipping state derivation (seek: {:?}, playback: {:?})",
                self.seek_state, self.playback_state
            );
            return effects;
        }

        if status.did_just_finish && !status.is_looping {
            self.set_playback_state(PlaybackState::Ended, now, &mut effects);
        } else if !self.connected && status.is_buffering {
            let message = self.config.playback.offline_message.clone();
            self.enter_error(message, now, &mut effects);
        } else {
            self.set_playback_state(PlaybackState::from_status(status), now, &mut effects);
        }

        effects
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            debug!("Connectivity changed: connected={}", connected);
        }
        self.connected = connected;
    }

    pub fn on_host_response(
        &mut self,
        request: &HostRequest,
        outcome: HostOutcome,
        now: Instant,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        match (request, outcome) {
            (HostRequest::Load(_), Ok(Some(status))) => {
                effects = self.on_status_update(&status, now);
            }
            (HostRequest::Load(_), Ok(None)) => {}
            (HostRequest::Load(source), Err(e)) => {
                let message = format!("Failed to load {}: {}", source.uri, e);
                self.enter_error(message.clone(), now, &mut effects);
                effects.push(Effect::Report(PlayerError::fatal(message)));
            }
            (HostRequest::ConfigureAudio(_), Err(e)) => {
                effects.push(Effect::Report(PlayerError::non_fatal(format!(
                    "Failed to configure audio mode: {}",
                    e
                ))));
            }
            (HostRequest::Seek { id, .. }, outcome) => {
                self.finish_seek(*id, outcome, now, &mut effects);
            }
            (request, Err(e)) => {
                effects.push(Effect::Report(PlayerError::non_fatal(format!(
                    "{:?} rejected: {}",
                    request, e
                ))));
            }
            (_, Ok(_)) => {}
        }

        effects
    }

    fn finish_seek(
        &mut self,
        id: TimerId,
        outcome: HostOutcome,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        let current = self.pending_seek == Some(id) && self.seek_state == SeekState::Seeked;

        if let Err(e) = &outcome {
            effects.push(Effect::Report(PlayerError::non_fatal(format!(
                "Seek failed: {}",
                e
            ))));
        }

        if !current {
            debug!("Ignoring acknowledgement for superseded seek {:?}", id);
            return;
        }

        self.pending_seek = None;
        self.seek_state = SeekState::NotSeeking;

        if let Ok(Some(status)) = outcome {
            if status.is_loaded {
                self.record_status(&status);
            }
            self.set_playback_state(PlaybackState::from_status(&status), now, effects);
        }

        self.reset_controls_timer_into(effects);
    }

    // ---- gestures ----

    /// First movement of a seek drag.
    pub fn begin_seek(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.seek_state == SeekState::Seeking {
            return effects;
        }

        // After a seek is released but before its acknowledgement, the cached
        // `should_play` reflects the pause we issued, not the user's intent.
        if self.seek_state != SeekState::Seeked {
            self.should_play_at_seek_end = self.should_play;
        }
        self.pending_seek = None;
        self.cancel_hide_timer(&mut effects);
        self.seek_state = SeekState::Seeking;
        debug!(
            "Seek started (resume afterwards: {})",
            self.should_play_at_seek_end
        );

        effects.push(Effect::Host(HostRequest::Pause));
        effects
    }

    /// Release of a seek drag at `fraction` of the duration.
    pub fn complete_seek(&mut self, fraction: f64, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.seek_state == SeekState::NotSeeking {
            self.should_play_at_seek_end = self.should_play;
        }

        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let position_ms = (fraction * self.duration_ms as f64).round() as u64;

        self.seek_state = SeekState::Seeked;
        self.reset_controls_timer_into(&mut effects);

        let optimistic = if self.should_play_at_seek_end {
            PlaybackState::Buffering
        } else {
            PlaybackState::Paused
        };
        self.set_playback_state(optimistic, now, &mut effects);
        self.position_ms = position_ms;

        let id = self.next_id();
        self.pending_seek = Some(id);
        debug!("Seek released at {}ms", position_ms);

        effects.push(Effect::Host(HostRequest::Seek {
            id,
            position_ms,
            should_play: self.should_play_at_seek_end,
        }));
        effects
    }

    pub fn tap_seek_bar(&mut self, fraction: f64, now: Instant) -> Vec<Effect> {
        if !self.playback_state.allows_seek() {
            debug!("Seek bar disabled while {:?}", self.playback_state);
            return Vec::new();
        }

        let mut effects = self.begin_seek();
        effects.extend(self.complete_seek(fraction, now));
        effects
    }

    pub fn toggle_play_pause(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        // A tap on hidden controls only wakes them up
        if self.controls_state == ControlsState::Hidden {
            self.show_controls(now, &mut effects);
            return effects;
        }

        self.reset_controls_timer_into(&mut effects);
        let should_play = self.playback_state != PlaybackState::Playing;
        effects.push(Effect::Host(HostRequest::SetPlaying(should_play)));
        effects
    }

    pub fn replay(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.reset_controls_timer_into(&mut effects);
        effects.push(Effect::Host(HostRequest::Replay));
        // Ended is never left by status updates, so leave it here
        self.set_playback_state(PlaybackState::Playing, now, &mut effects);
        effects
    }

    pub fn toggle_controls(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        match self.controls_state {
            ControlsState::Shown => {
                let duration = self.config.controls.quick_fade_out();
                self.hide_controls(duration, now, &mut effects);
            }
            ControlsState::Hidden | ControlsState::Hiding => {
                self.show_controls(now, &mut effects);
            }
            ControlsState::Showing => {
                debug!("Controls are fading in, ignoring toggle");
            }
        }

        effects
    }

    pub fn reset_controls_timer(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.reset_controls_timer_into(&mut effects);
        effects
    }

    pub fn toggle_fullscreen(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.reset_controls_timer_into(&mut effects);
        let request = if self.in_fullscreen {
            FullscreenRequest::Exit
        } else {
            FullscreenRequest::Enter
        };
        effects.push(Effect::Fullscreen(request));
        effects
    }

    pub fn set_fullscreen(&mut self, in_fullscreen: bool) {
        self.in_fullscreen = in_fullscreen;
    }

    // ---- timers ----

    pub fn on_timer(&mut self, kind: TimerKind, id: TimerId, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        match kind {
            TimerKind::HideControls => {
                if self.hide_timer != Some(id) {
                    trace!("Stale hide timer {:?}", id);
                    return effects;
                }
                self.hide_timer = None;

                if self.controls_state == ControlsState::Shown
                    && self.seek_state != SeekState::Seeking
                    && !self.playback_state.suspends_auto_hide()
                {
                    let duration = self.config.controls.fade_out();
                    self.hide_controls(duration, now, &mut effects);
                }
            }
            TimerKind::BufferingSpinner => {
                if self.spinner_timer == Some(id) {
                    self.spinner_timer = None;
                }
            }
            TimerKind::Fade => {
                let Some(fade) = self.fade else {
                    return effects;
                };
                if fade.id != id {
                    trace!("Stale fade completion {:?}", id);
                    return effects;
                }
                self.fade = None;

                match self.controls_state {
                    ControlsState::Showing => {
                        self.controls_state = ControlsState::Shown;
                        self.reset_controls_timer_into(&mut effects);
                    }
                    ControlsState::Hiding => {
                        self.controls_state = ControlsState::Hidden;
                    }
                    ControlsState::Shown | ControlsState::Hidden => {}
                }
                debug!("Controls fade finished: {:?}", self.controls_state);
            }
        }

        effects
    }

    /// Releases every timer and fade; the session issues nothing afterwards.
    pub fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.cancel_hide_timer(&mut effects);
        if self.spinner_timer.take().is_some() {
            effects.push(Effect::CancelTimer(TimerKind::BufferingSpinner));
        }
        if self.fade.take().is_some() {
            effects.push(Effect::CancelTimer(TimerKind::Fade));
        }
        self.pending_seek = None;
        effects
    }

    // ---- presentation ----

    pub fn is_spinner_visible(&self, now: Instant) -> bool {
        match self.playback_state {
            PlaybackState::Loading => true,
            PlaybackState::Buffering => {
                now.saturating_duration_since(self.last_state_change)
                    > self.config.playback.buffering_show_delay()
            }
            _ => false,
        }
    }

    pub fn controls_opacity(&self, now: Instant) -> f32 {
        match (&self.fade, self.controls_state) {
            (Some(fade), _) => fade.opacity_at(now),
            (None, ControlsState::Shown | ControlsState::Showing) => 1.0,
            (None, ControlsState::Hidden | ControlsState::Hiding) => 0.0,
        }
    }

    pub fn seek_fraction(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    pub fn center_control(&self) -> CenterControl {
        match self.playback_state {
            PlaybackState::Ended => CenterControl::Replay,
            _ if self.seek_state == SeekState::Seeking => CenterControl::None,
            PlaybackState::Playing => CenterControl::Pause,
            PlaybackState::Paused => CenterControl::Play,
            _ => CenterControl::None,
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            playback_state: self.playback_state,
            seek_state: self.seek_state,
            controls_state: self.controls_state,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            position_label: format_millis(self.position_ms),
            duration_label: format_millis(self.duration_ms),
            seek_fraction: self.seek_fraction(),
            seek_bar_enabled: self.playback_state.allows_seek(),
            spinner_visible: self.is_spinner_visible(now),
            controls_opacity: self.controls_opacity(now),
            center_control: self.center_control(),
            error_message: self.error_message.clone(),
            in_fullscreen: self.in_fullscreen,
        }
    }

    // ---- internals ----

    fn next_id(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }

    fn record_status(&mut self, status: &PlaybackStatus) {
        self.has_loaded = true;
        self.position_ms = status.position_millis.unwrap_or(0);
        self.duration_ms = status.duration_millis.unwrap_or(0);
        self.should_play = status.should_play;
    }

    fn enter_error(&mut self, message: String, now: Instant, effects: &mut Vec<Effect>) {
        warn!("Playback error: {}", message);
        self.set_playback_state(PlaybackState::Error, now, effects);
        self.error_message = Some(message);
    }

    fn set_playback_state(&mut self, state: PlaybackState, now: Instant, effects: &mut Vec<Effect>) {
        if self.playback_state == state {
            return;
        }

        debug!("Playback state {:?} -> {:?}", self.playback_state, state);
        self.playback_state = state;
        self.last_state_change = now;

        if state != PlaybackState::Error {
            self.error_message = None;
        }

        if state == PlaybackState::Buffering {
            let id = self.next_id();
            self.spinner_timer = Some(id);
            // The spinner is due strictly after the delay
            let after = self.config.playback.buffering_show_delay() + Duration::from_millis(1);
            effects.push(Effect::StartTimer {
                id,
                kind: TimerKind::BufferingSpinner,
                after,
            });
        } else if self.spinner_timer.take().is_some() {
            effects.push(Effect::CancelTimer(TimerKind::BufferingSpinner));
        }
    }

    fn show_controls(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let duration = self.config.controls.fade_in();
        self.start_fade(1.0, duration, now, effects);
        self.controls_state = ControlsState::Showing;
    }

    fn hide_controls(&mut self, duration: Duration, now: Instant, effects: &mut Vec<Effect>) {
        self.cancel_hide_timer(effects);
        self.start_fade(0.0, duration, now, effects);
        self.controls_state = ControlsState::Hiding;
    }

    /// Starts from the current opacity, so call before changing `controls_state`
    fn start_fade(&mut self, to: f32, duration: Duration, now: Instant, effects: &mut Vec<Effect>) {
        let from = self.controls_opacity(now);
        let id = self.next_id();
        self.fade = Some(Fade {
            id,
            from,
            to,
            duration,
            started_at: now,
        });
        effects.push(Effect::StartTimer {
            id,
            kind: TimerKind::Fade,
            after: duration,
        });
    }

    fn schedule_hide_timer(&mut self, effects: &mut Vec<Effect>) {
        let id = self.next_id();
        self.hide_timer = Some(id);
        effects.push(Effect::StartTimer {
            id,
            kind: TimerKind::HideControls,
            after: self.config.controls.hide_controls_after(),
        });
    }

    fn cancel_hide_timer(&mut self, effects: &mut Vec<Effect>) {
        if self.hide_timer.take().is_some() {
            effects.push(Effect::CancelTimer(TimerKind::HideControls));
        }
    }

    /// The hide timer only runs while the controls are fully shown and no
    /// seek drag is in progress; releasing the drag rearms it.
    fn reset_controls_timer_into(&mut self, effects: &mut Vec<Effect>) {
        if self.controls_state == ControlsState::Shown && self.seek_state != SeekState::Seeking {
            self.schedule_hide_timer(effects);
        }
    }
}
