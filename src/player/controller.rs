use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use super::session::{Effect, HostOutcome, HostRequest, PlaybackSession, TimerId, TimerKind};
use super::timer::ScopedTimer;
use super::traits::MediaHost;
use super::types::{MediaSource, PlaybackStatus, SessionSnapshot};
use crate::config::Config;
use crate::events::{EventBus, EventFilter, EventPayload, EventSubscriber, SessionEvent};
use crate::utils::{ControllerError, PlayerError};

const EVENT_CAPACITY: usize = 64;

/// User interaction forwarded from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    BeginSeek,
    CompleteSeek(f64),
    TapSeekBar(f64),
    TogglePlayPause,
    Replay,
    ToggleControls,
    ResetControlsTimer,
    ToggleFullscreen,
}

/// Commands that can be sent to the player controller
#[derive(Debug)]
pub enum PlayerCommand {
    /// Status snapshot pushed by the host
    ReportStatus(PlaybackStatus),
    /// Network connectivity changed
    SetConnected(bool),
    /// Presentation switched in or out of fullscreen
    SetFullscreen(bool),
    /// Apply a gesture and answer with the resulting state
    Gesture {
        gesture: Gesture,
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
    GetSnapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
    /// Cancel timers and host calls, then stop
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Completions fed back into the controller loop
#[derive(Debug)]
enum InternalEvent {
    HostCompleted {
        request: HostRequest,
        outcome: HostOutcome,
    },
    TimerElapsed {
        kind: TimerKind,
        id: TimerId,
    },
}

/// Controller that owns one playback session and talks to the host
pub struct PlayerController {
    session_id: Uuid,
    session: PlaybackSession,
    source: MediaSource,
    receiver: mpsc::UnboundedReceiver<PlayerCommand>,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    internal_rx: mpsc::UnboundedReceiver<InternalEvent>,
    host: Arc<dyn MediaHost>,
    host_tx: mpsc::UnboundedSender<HostRequest>,
    host_rx: Option<mpsc::UnboundedReceiver<HostRequest>>,
    host_worker: Option<JoinHandle<()>>,
    error_sender: mpsc::UnboundedSender<PlayerError>,
    events: EventBus,
    timers: HashMap<TimerKind, ScopedTimer>,
    token: CancellationToken,
    last_snapshot: Option<SessionSnapshot>,
}

impl PlayerController {
    /// Create a controller for `source`. A missing or empty source is fatal.
    ///
    /// Nothing is spawned until [`run`](Self::run) is awaited.
    pub fn new(
        host: Arc<dyn MediaHost>,
        source: Option<MediaSource>,
        config: Config,
    ) -> Result<(PlayerHandle, PlayerController), PlayerError> {
        let source = match source {
            Some(source) if !source.uri.trim().is_empty() => source,
            _ => {
                error!("Cannot start playback session without a media source");
                return Err(PlayerError::fatal("`source` is a required property"));
            }
        };

        let session_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let events = EventBus::new(EVENT_CAPACITY);
        let token = CancellationToken::new();

        let controller = PlayerController {
            session_id,
            session: PlaybackSession::new(config, Instant::now()),
            source,
            receiver,
            internal_tx,
            internal_rx,
            host,
            host_tx,
            host_rx: Some(host_rx),
            host_worker: None,
            error_sender: error_tx,
            events: events.clone(),
            timers: HashMap::new(),
            token,
            last_snapshot: None,
        };
        let handle = PlayerHandle {
            session_id,
            sender,
            events,
            error_receiver: Arc::new(Mutex::new(Some(error_rx))),
        };

        Ok((handle, controller))
    }

    /// Create the controller and run it on the current runtime
    pub fn spawn(
        host: Arc<dyn MediaHost>,
        source: Option<MediaSource>,
        config: Config,
    ) -> Result<PlayerHandle, PlayerError> {
        let (handle, controller) = Self::new(host, source, config)?;
        tokio::spawn(controller.run());
        Ok(handle)
    }

    /// Run the controller event loop until shutdown or every handle is dropped
    #[instrument(name = "playback_session", skip(self), fields(id = %self.session_id))]
    pub async fn run(mut self) {
        info!("Playback session started for {}", self.source.uri);

        if let Some(requests) = self.host_rx.take() {
            self.host_worker = Some(spawn_host_worker(
                Arc::clone(&self.host),
                requests,
                self.internal_tx.clone(),
                self.token.clone(),
            ));
        }

        let effects = self.session.start(self.source.clone());
        self.apply(effects);

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            return;
                        }
                    }
                    None => break,
                },
                Some(event) = self.internal_rx.recv() => self.handle_internal(event),
            }
        }

        self.teardown();
    }

    fn handle_command(&mut self, command: PlayerCommand) -> ControlFlow<()> {
        let now = Instant::now();

        match command {
            PlayerCommand::ReportStatus(status) => {
                trace!("Status update: {:?}", status);
                self.publish(EventPayload::Status(status.clone()));
                let effects = self.session.on_status_update(&status, now);
                self.apply(effects);
            }
            PlayerCommand::SetConnected(connected) => {
                self.session.set_connected(connected);
            }
            PlayerCommand::SetFullscreen(in_fullscreen) => {
                self.session.set_fullscreen(in_fullscreen);
                self.apply(Vec::new());
            }
            PlayerCommand::Gesture {
                gesture,
                respond_to,
            } => {
                trace!("Gesture: {:?}", gesture);
                let effects = match gesture {
                    Gesture::BeginSeek => self.session.begin_seek(),
                    Gesture::CompleteSeek(fraction) => self.session.complete_seek(fraction, now),
                    Gesture::TapSeekBar(fraction) => self.session.tap_seek_bar(fraction, now),
                    Gesture::TogglePlayPause => self.session.toggle_play_pause(now),
                    Gesture::Replay => self.session.replay(now),
                    Gesture::ToggleControls => self.session.toggle_controls(now),
                    Gesture::ResetControlsTimer => self.session.reset_controls_timer(),
                    Gesture::ToggleFullscreen => self.session.toggle_fullscreen(),
                };
                self.apply(effects);
                let _ = respond_to.send(self.session.snapshot(now));
            }
            PlayerCommand::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.session.snapshot(now));
            }
            PlayerCommand::Shutdown { respond_to } => {
                self.receiver.close();
                self.teardown();
                let _ = respond_to.send(());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn handle_internal(&mut self, event: InternalEvent) {
        let now = Instant::now();

        let effects = match event {
            InternalEvent::HostCompleted { request, outcome } => {
                if let Err(e) = &outcome {
                    debug!("Host rejected {:?}: {}", request, e);
                }
                self.session.on_host_response(&request, outcome, now)
            }
            InternalEvent::TimerElapsed { kind, id } => {
                trace!("Timer elapsed: {:?}", kind);
                self.session.on_timer(kind, id, now)
            }
        };

        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Host(request) => self.issue(request),
                Effect::StartTimer { id, kind, after } => {
                    let timer = ScopedTimer::spawn(
                        after,
                        self.internal_tx.clone(),
                        InternalEvent::TimerElapsed { kind, id },
                        self.token.child_token(),
                    );
                    // Replacing the entry aborts the previous timer of this kind
                    self.timers.insert(kind, timer);
                }
                Effect::CancelTimer(kind) => {
                    self.timers.remove(&kind);
                }
                Effect::Report(error) => self.report(error),
                Effect::Fullscreen(request) => {
                    debug!("Requesting fullscreen change: {:?}", request);
                    self.publish(EventPayload::Fullscreen(request));
                }
            }
        }

        self.publish_snapshot();
    }

    fn issue(&self, request: HostRequest) {
        if self.token.is_cancelled() {
            return;
        }
        trace!("Issuing host request: {:?}", request);
        if self.host_tx.send(request).is_err() {
            warn!("Host worker stopped, dropping request");
        }
    }

    fn report(&self, error: PlayerError) {
        if error.is_fatal() {
            error!("{}", error.message);
        } else {
            warn!("{}", error.message);
        }
        let _ = self.error_sender.send(error.clone());
        self.publish(EventPayload::Error(error));
    }

    fn publish(&self, payload: EventPayload) {
        self.events.publish(SessionEvent::new(self.session_id, payload));
    }

    fn publish_snapshot(&mut self) {
        let snapshot = self.session.snapshot(Instant::now());
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return;
        }
        self.last_snapshot = Some(snapshot.clone());
        self.publish(EventPayload::Snapshot(snapshot));
    }

    fn teardown(&mut self) {
        if self.token.is_cancelled() {
            return;
        }

        for effect in self.session.teardown() {
            if let Effect::CancelTimer(kind) = effect {
                self.timers.remove(&kind);
            }
        }
        self.timers.clear();
        self.token.cancel();
        if let Some(worker) = self.host_worker.take() {
            worker.abort();
        }

        self.publish(EventPayload::Closed);
        info!("Playback session closed");
    }
}

/// Runs host requests one at a time, in the order they were issued
fn spawn_host_worker(
    host: Arc<dyn MediaHost>,
    mut requests: mpsc::UnboundedReceiver<HostRequest>,
    completions: mpsc::UnboundedSender<InternalEvent>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let request = tokio::select! {
                _ = token.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let outcome = tokio::select! {
                _ = token.cancelled() => break,
                outcome = execute(host.as_ref(), &request) => outcome,
            };

            if completions
                .send(InternalEvent::HostCompleted { request, outcome })
                .is_err()
            {
                break;
            }
        }
        trace!("Host worker stopped");
    })
}

async fn execute(host: &dyn MediaHost, request: &HostRequest) -> HostOutcome {
    match request {
        HostRequest::Load(source) => host.load(source).await.map(Some),
        HostRequest::ConfigureAudio(mode) => host.configure_audio(mode).await.map(|_| None),
        HostRequest::Pause | HostRequest::SetPlaying(false) => host.pause().await.map(Some),
        HostRequest::SetPlaying(true) => host.play().await.map(Some),
        HostRequest::Seek {
            position_ms,
            should_play,
            ..
        } => host.seek_to(*position_ms, *should_play).await.map(Some),
        HostRequest::Replay => host.seek_to(0, true).await.map(Some),
    }
}

/// Handle to send commands to the player controller
#[derive(Clone)]
pub struct PlayerHandle {
    session_id: Uuid,
    sender: mpsc::UnboundedSender<PlayerCommand>,
    events: EventBus,
    error_receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<PlayerError>>>>,
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("session_id", &self.session_id)
            .field("sender", &"<UnboundedSender>")
            .field("error_receiver", &"<Arc<Mutex<...>>>")
            .finish()
    }
}

impl PlayerHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Take the error receiver (can only be done once)
    pub fn take_error_receiver(&self) -> Option<mpsc::UnboundedReceiver<PlayerError>> {
        self.error_receiver
            .lock()
            .ok()
            .and_then(|mut receiver| receiver.take())
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventSubscriber {
        self.events.subscribe_filtered(filter)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Forward a host status snapshot
    pub fn report_status(&self, status: PlaybackStatus) -> Result<(), ControllerError> {
        self.send(PlayerCommand::ReportStatus(status))
    }

    pub fn set_connected(&self, connected: bool) -> Result<(), ControllerError> {
        self.send(PlayerCommand::SetConnected(connected))
    }

    pub fn set_fullscreen(&self, in_fullscreen: bool) -> Result<(), ControllerError> {
        self.send(PlayerCommand::SetFullscreen(in_fullscreen))
    }

    /// First movement of a seek drag
    pub async fn begin_seek(&self) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::BeginSeek).await
    }

    /// Seek drag released at `fraction` of the duration
    pub async fn complete_seek(&self, fraction: f64) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::CompleteSeek(fraction)).await
    }

    pub async fn tap_seek_bar(&self, fraction: f64) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::TapSeekBar(fraction)).await
    }

    pub async fn toggle_play_pause(&self) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::TogglePlayPause).await
    }

    pub async fn replay(&self) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::Replay).await
    }

    pub async fn toggle_controls(&self) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::ToggleControls).await
    }

    pub async fn reset_controls_timer(&self) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::ResetControlsTimer).await
    }

    pub async fn toggle_fullscreen(&self) -> Result<SessionSnapshot, ControllerError> {
        self.gesture(Gesture::ToggleFullscreen).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, ControllerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(PlayerCommand::GetSnapshot { respond_to })?;
        response.await.map_err(|_| ControllerError::NoResponse)
    }

    /// Stop the session; pending timers and host calls are cancelled
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(PlayerCommand::Shutdown { respond_to })?;
        response.await.map_err(|_| ControllerError::NoResponse)
    }

    async fn gesture(&self, gesture: Gesture) -> Result<SessionSnapshot, ControllerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(PlayerCommand::Gesture {
            gesture,
            respond_to,
        })?;
        response.await.map_err(|_| ControllerError::NoResponse)
    }

    fn send(&self, command: PlayerCommand) -> Result<(), ControllerError> {
        self.sender
            .send(command)
            .map_err(|_| ControllerError::SessionClosed)
    }
}
