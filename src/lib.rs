// Video playback control surface: session state machine, controller actor
// and the host seam it drives.

pub mod config;
pub mod events;
pub mod player;
pub mod utils;

pub use config::Config;
pub use player::{MediaHost, MediaSource, PlayerController, PlayerHandle};
pub use utils::{ControllerError, ErrorSeverity, PlayerError};
