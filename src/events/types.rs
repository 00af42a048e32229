use serde::Serialize;
use uuid::Uuid;

use crate::player::{FullscreenRequest, PlaybackStatus, SessionSnapshot};
use crate::utils::PlayerError;

/// Event published by a running session
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub payload: EventPayload,
}

impl SessionEvent {
    pub fn new(session_id: Uuid, payload: EventPayload) -> Self {
        Self {
            session_id,
            payload,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    /// Raw host status, forwarded as received
    Status(PlaybackStatus),
    /// Presentation state after a transition
    Snapshot(SessionSnapshot),
    Fullscreen(FullscreenRequest),
    Error(PlayerError),
    Closed,
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Status(_) => EventType::Status,
            EventPayload::Snapshot(_) => EventType::Snapshot,
            EventPayload::Fullscreen(_) => EventType::Fullscreen,
            EventPayload::Error(_) => EventType::Error,
            EventPayload::Closed => EventType::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    Status,
    Snapshot,
    Fullscreen,
    Error,
    Closed,
}
