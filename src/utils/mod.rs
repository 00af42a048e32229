pub mod errors;
pub mod format;

pub use errors::{ControllerError, ErrorSeverity, HostError, PlayerError};
pub use format::{format_duration, format_millis};
