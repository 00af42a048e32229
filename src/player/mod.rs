pub mod controller;
pub mod session;
pub mod simulated;
mod timer;
pub mod traits;
pub mod types;

pub use controller::{Gesture, PlayerCommand, PlayerController, PlayerHandle};
pub use session::{Effect, HostOutcome, HostRequest, PlaybackSession, TimerId, TimerKind};
pub use simulated::SimulatedMedia;
pub use traits::MediaHost;
pub use types::{
    AudioMode, CenterControl, ControlsState, FullscreenRequest, MediaSource, PlaybackState,
    PlaybackStatus, SeekState, SessionSnapshot, StatusChange,
};
