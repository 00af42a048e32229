/// Common types shared by the session, the controller and host backends
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Loading,
    Playing,
    Paused,
    Buffering,
    Error,
    Ended,
}

impl PlaybackState {
    /// State implied by a host status, Playing over Buffering over Paused.
    pub fn from_status(status: &PlaybackStatus) -> Self {
        if !status.is_loaded {
            PlaybackState::Error
        } else if status.is_playing {
            PlaybackState::Playing
        } else if status.is_buffering {
            PlaybackState::Buffering
        } else {
            PlaybackState::Paused
        }
    }

    /// Auto-hide is suspended while playback is stopped on screen
    pub fn suspends_auto_hide(&self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Ended)
    }

    pub fn allows_seek(&self) -> bool {
        !matches!(self, PlaybackState::Loading | PlaybackState::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeekState {
    NotSeeking,
    /// User is dragging the seek bar
    Seeking,
    /// Drag released, waiting for the host to acknowledge the seek
    Seeked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlsState {
    Shown,
    Showing,
    Hidden,
    Hiding,
}

/// Snapshot delivered by the host media primitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub position_millis: Option<u64>,
    pub duration_millis: Option<u64>,
    pub should_play: bool,
    pub did_just_finish: bool,
    pub is_looping: bool,
    pub error: Option<String>,
}

impl PlaybackStatus {
    pub fn loaded() -> Self {
        Self {
            is_loaded: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_loaded: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Partial status change requested from the host. `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub should_play: Option<bool>,
    pub position_millis: Option<u64>,
}

impl StatusChange {
    pub fn play() -> Self {
        Self {
            should_play: Some(true),
            position_millis: None,
        }
    }

    pub fn pause() -> Self {
        Self {
            should_play: Some(false),
            position_millis: None,
        }
    }

    pub fn seek(position_millis: u64, should_play: bool) -> Self {
        Self {
            should_play: Some(should_play),
            position_millis: Some(position_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub uri: String,
}

impl MediaSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Audio session behaviour requested when a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioMode {
    pub plays_in_silent_mode: bool,
    pub duck_others: bool,
    pub stays_active_in_background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FullscreenRequest {
    Enter,
    Exit,
}

/// Which control sits in the centre of the video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CenterControl {
    None,
    Play,
    Pause,
    Replay,
}

/// Everything the presentation layer needs to draw the control surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub playback_state: PlaybackState,
    pub seek_state: SeekState,
    pub controls_state: ControlsState,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub position_label: String,
    pub duration_label: String,
    pub seek_fraction: f64,
    pub seek_bar_enabled: bool,
    pub spinner_visible: bool,
    pub controls_opacity: f32,
    pub center_control: CenterControl,
    pub error_message: Option<String>,
    pub in_fullscreen: bool,
}
