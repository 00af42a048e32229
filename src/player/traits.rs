use async_trait::async_trait;

use super::types::{AudioMode, MediaSource, PlaybackStatus, StatusChange};
use crate::utils::HostError;

/// The host media primitive that actually decodes and renders.
///
/// Every command resolves to the status the host settled on, or a rejection.
/// Status updates between commands are pushed through
/// [`PlayerHandle::report_status`](super::PlayerHandle::report_status).
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn load(&self, source: &MediaSource) -> Result<PlaybackStatus, HostError>;
    async fn set_status(&self, change: StatusChange) -> Result<PlaybackStatus, HostError>;
    async fn configure_audio(&self, mode: &AudioMode) -> Result<(), HostError>;

    async fn play(&self) -> Result<PlaybackStatus, HostError> {
        self.set_status(StatusChange::play()).await
    }

    async fn pause(&self) -> Result<PlaybackStatus, HostError> {
        self.set_status(StatusChange::pause()).await
    }

    async fn seek_to(
        &self,
        position_millis: u64,
        should_play: bool,
    ) -> Result<PlaybackStatus, HostError> {
        self.set_status(StatusChange::seek(position_millis, should_play))
            .await
    }
}
