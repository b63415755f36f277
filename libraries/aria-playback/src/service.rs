//! Player service
//!
//! Runs the orchestrator on its own task. UI commands arrive through a
//! [`PlayerHandle`] and are answered on oneshot channels; engine events,
//! session events and the progress ticker are multiplexed on the same task,
//! so nothing touches the orchestrator concurrently.

use crate::engine::EngineEvent;
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::orchestrator::PlaybackOrchestrator;
use crate::session::SessionEvent;
use crate::types::{PlayRequest, PlayerSnapshot, TransportState};
use aria_core::AlbumId;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Pending commands before senders wait
const COMMAND_CAPACITY: usize = 32;

/// Commands accepted by the player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play(PlayRequest),
    PlayAlbum(AlbumId),
    Pause,
    Resume,
    Toggle,
    Stop,
    SkipForward,
    SkipBackward,
    SeekTo(Duration),
    SeekToPercent(f64),
}

struct Request {
    command: PlayerCommand,
    reply: oneshot::Sender<Result<()>>,
}

/// Spawns the player task
pub struct PlayerService;

impl PlayerService {
    /// Start the player task; it runs until every handle is dropped
    pub fn spawn(
        orchestrator: PlaybackOrchestrator,
        engine_events: mpsc::UnboundedReceiver<EngineEvent>,
        session_events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> PlayerHandle {
        let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = PlayerHandle {
            commands,
            snapshot: orchestrator.subscribe(),
            events: orchestrator.event_sender(),
        };

        tokio::spawn(run(orchestrator, rx, engine_events, session_events));
        handle
    }
}

async fn run(
    mut orchestrator: PlaybackOrchestrator,
    mut commands: mpsc::Receiver<Request>,
    mut engine_events: mpsc::UnboundedReceiver<EngineEvent>,
    mut session_events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    let mut ticker = tokio::time::interval(orchestrator.config().progress_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    let mut engine_open = true;
    let mut session_open = true;

    loop {
        tokio::select! {
            biased;

            event = engine_events.recv(), if engine_open => match event {
                Some(event) => orchestrator.handle_engine_event(event).await,
                None => {
                    warn!("Engine event channel closed");
                    engine_open = false;
                }
            },

            event = session_events.recv(), if session_open => match event {
                Some(event) => {
                    if let Err(e) = orchestrator.handle_session_event(event).await {
                        warn!(error = %e, "Failed to handle audio session event");
                    }
                }
                None => session_open = false,
            },

            request = commands.recv() => match request {
                Some(Request { command, reply }) => {
                    debug!(?command, "Player command");
                    let result = execute(&mut orchestrator, command).await;
                    let _ = reply.send(result);
                }
                None => break,
            },

            _ = ticker.tick() => {
                if orchestrator.transport() == TransportState::Playing {
                    orchestrator.report_progress().await;
                }
            }
        }
    }

    if let Err(e) = orchestrator.stop().await {
        warn!(error = %e, "Failed to stop playback on shutdown");
    }
    debug!("Player service stopped");
}

async fn execute(orchestrator: &mut PlaybackOrchestrator, command: PlayerCommand) -> Result<()> {
    match command {
        PlayerCommand::Play(request) => orchestrator.play(request).await,
        PlayerCommand::PlayAlbum(album_id) => orchestrator.play_album(&album_id).await,
        PlayerCommand::Pause => orchestrator.pause().await,
        PlayerCommand::Resume => orchestrator.resume().await,
        PlayerCommand::Toggle => orchestrator.toggle().await,
        PlayerCommand::Stop => orchestrator.stop().await,
        PlayerCommand::SkipForward => orchestrator.skip_forward().await,
        PlayerCommand::SkipBackward => orchestrator.skip_backward().await,
        PlayerCommand::SeekTo(position) => orchestrator.seek_to(position).await,
        PlayerCommand::SeekToPercent(percent) => orchestrator.seek_to_percent(percent).await,
    }
}

/// Cloneable handle to a running player
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Request>,
    snapshot: watch::Receiver<PlayerSnapshot>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlayerHandle {
    /// Send a command and wait for its outcome
    pub async fn send_command(&self, command: PlayerCommand) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| PlaybackError::ServiceStopped)?;

        response.await.map_err(|_| PlaybackError::ServiceStopped)?
    }

    pub async fn play(&self, request: PlayRequest) -> Result<()> {
        self.send_command(PlayerCommand::Play(request)).await
    }

    pub async fn play_album(&self, album_id: AlbumId) -> Result<()> {
        self.send_command(PlayerCommand::PlayAlbum(album_id)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send_command(PlayerCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send_command(PlayerCommand::Resume).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send_command(PlayerCommand::Toggle).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send_command(PlayerCommand::Stop).await
    }

    pub async fn skip_forward(&self) -> Result<()> {
        self.send_command(PlayerCommand::SkipForward).await
    }

    pub async fn skip_backward(&self) -> Result<()> {
        self.send_command(PlayerCommand::SkipBackward).await
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.send_command(PlayerCommand::SeekTo(position)).await
    }

    pub async fn seek_to_percent(&self, percent: f64) -> Result<()> {
        self.send_command(PlayerCommand::SeekToPercent(percent)).await
    }

    /// Latest player state
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch the player state
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.clone()
    }

    /// Receive player events from now on
    pub fn events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}
