//! Playback orchestrator
//!
//! Owns the playback state machine and mediates between the UI, the
//! platform engine, the audio session, the local cache and the media
//! server. Every method takes `&mut self`; the player service serializes
//! calls so commands and engine events never interleave.
//!
//! Transport: `Stopped -> Playing <-> Paused -> Stopped`.
//! Session: `Inactive -> Configured -> Active -> Inactive`.

use crate::clock::PositionClock;
use crate::engine::{
    EngineEvent, EngineItem, EngineStatus, InsertPosition, ItemKey, PlaybackEngine, WaitingReason,
};
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::history::History;
use crate::session::{
    AudioSession, NoNowPlaying, NowPlayingCenter, NowPlayingInfo, SessionEvent,
};
use crate::types::{PlayRequest, PlayerConfig, PlayerSnapshot, SessionState, TransportState};
use aria_core::{
    AlbumId, CatalogRepository, MediaSource, PlaybackReport, RemoteMediaService, Song, SongId,
};
use aria_offline::{CacheError, CacheLease, LocalCache};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 64;

/// The song the engine is playing, as the orchestrator knows it
struct Current {
    key: ItemKey,
    song: Song,
    /// Keeps the cached file on disk while it is being read
    _lease: Option<CacheLease>,
}

/// Playback state machine
pub struct PlaybackOrchestrator {
    engine: Box<dyn PlaybackEngine>,
    session: Box<dyn AudioSession>,
    now_playing: Box<dyn NowPlayingCenter>,
    cache: LocalCache,
    remote: Arc<dyn RemoteMediaService>,
    catalog: Arc<dyn CatalogRepository>,
    config: PlayerConfig,

    transport: TransportState,
    session_state: SessionState,
    current: Option<Current>,
    clock: PositionClock,
    history: History,
    up_next: Vec<Song>,
    /// Engine item references mapped back to songs
    songs: HashMap<String, Song>,
    buffering: bool,
    paused_by_interruption: bool,

    snapshot: watch::Sender<PlayerSnapshot>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlaybackOrchestrator {
    pub fn new(
        engine: impl PlaybackEngine + 'static,
        session: impl AudioSession + 'static,
        cache: LocalCache,
        remote: Arc<dyn RemoteMediaService>,
        catalog: Arc<dyn CatalogRepository>,
        config: PlayerConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(PlayerSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            engine: Box::new(engine),
            session: Box::new(session),
            now_playing: Box::new(NoNowPlaying),
            cache,
            remote,
            catalog,
            history: History::new(config.history_size),
            config,
            transport: TransportState::Stopped,
            session_state: SessionState::Inactive,
            current: None,
            clock: PositionClock::default(),
            up_next: Vec::new(),
            songs: HashMap::new(),
            buffering: false,
            paused_by_interruption: false,
            snapshot,
            events,
        }
    }

    /// Mirror state to a system now-playing surface
    #[must_use]
    pub fn with_now_playing(mut self, center: impl NowPlayingCenter + 'static) -> Self {
        self.now_playing = Box::new(center);
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current.as_ref().map(|c| &c.song)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch the full player state
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.subscribe()
    }

    /// Receive player events from now on
    pub fn events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<PlayerEvent> {
        self.events.clone()
    }

    // ===== Transport =====

    pub async fn play(&mut self, request: PlayRequest) -> Result<()> {
        match request {
            PlayRequest::Resume => self.resume().await,
            PlayRequest::Songs {
                songs,
                preserve_queue,
            } => self.play_songs(songs, preserve_queue).await,
        }
    }

    /// Play an album from its first track
    pub async fn play_album(&mut self, album_id: &AlbumId) -> Result<()> {
        let songs = self.catalog.songs_in_album(album_id).await?;
        if songs.is_empty() {
            return Err(PlaybackError::Catalog(format!("album {album_id} has no songs")));
        }

        info!(album_id = %album_id, songs = songs.len(), "Playing album");
        self.play_songs(songs, false).await
    }

    async fn play_songs(&mut self, songs: Vec<Song>, preserve_queue: bool) -> Result<()> {
        let Some(first) = songs.first().map(|s| s.id.clone()) else {
            return Err(PlaybackError::NothingToPlay);
        };

        let mut resolved = Vec::with_capacity(songs.len());
        for song in songs {
            match self.resolve(&song).await {
                Ok(item) => resolved.push((item, song)),
                Err(e) => {
                    error!(song_id = %song.id, error = %e, "Skipping unplayable song");
                    self.alert(format!("Couldn't play \"{}\"", song.title));
                }
            }
        }

        if resolved.is_empty() {
            return Err(PlaybackError::SourceUnresolved(first));
        }

        self.ensure_session_active()?;
        self.finish_current().await;

        let mut items = Vec::with_capacity(resolved.len());
        for (item, song) in resolved {
            self.songs.insert(item.reference.clone(), song);
            items.push(item);
        }

        let upcoming = if preserve_queue {
            let playing = self.engine.current_item().map(|i| i.key);
            self.engine
                .items()
                .into_iter()
                .filter(|i| Some(i.key) != playing)
                .collect()
        } else {
            Vec::new()
        };

        debug!(items = items.len(), kept = upcoming.len(), "Replacing engine queue");
        self.engine.clear(false);
        self.engine.append(items, InsertPosition::Last)?;
        if !upcoming.is_empty() {
            self.engine.append(upcoming, InsertPosition::Last)?;
        }

        self.engine.play();
        self.paused_by_interruption = false;
        self.set_transport(TransportState::Playing);
        self.publish();
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<()> {
        if self.engine.current_item().is_none() {
            return Err(PlaybackError::NoCurrentSong);
        }

        self.ensure_session_active()?;
        self.engine.play();
        self.clock.resume();
        self.paused_by_interruption = false;
        self.set_transport(TransportState::Playing);
        self.refresh_now_playing();
        self.send_progress().await;
        self.publish();
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<()> {
        if self.transport != TransportState::Playing {
            return Ok(());
        }

        self.engine.pause();
        self.clock.pause();
        self.paused_by_interruption = false;
        self.set_transport(TransportState::Paused);
        self.refresh_now_playing();
        self.send_progress().await;
        self.publish();
        Ok(())
    }

    pub async fn toggle(&mut self) -> Result<()> {
        match self.transport {
            TransportState::Playing => self.pause().await,
            TransportState::Paused | TransportState::Stopped => self.resume().await,
        }
    }

    /// Clear the queue and release the audio session
    pub async fn stop(&mut self) -> Result<()> {
        let previous = match self.current.take() {
            Some(current) => {
                let report = self.report_for(&current.song.id, self.clock.position());
                if let Err(e) = self.remote.report_playback_stopped(&report).await {
                    warn!(song_id = %current.song.id, error = %e, "Failed to report playback stop");
                }
                Some(current.song.id)
            }
            None => None,
        };

        self.engine.clear(false);
        self.clock.reset(Duration::ZERO, false);
        self.deactivate_session();
        self.up_next.clear();
        self.songs.clear();
        self.paused_by_interruption = false;
        self.set_transport(TransportState::Stopped);
        self.now_playing.update(None);

        if previous.is_some() {
            self.emit(PlayerEvent::SongChanged {
                previous,
                current: None,
            });
        }
        self.publish();
        info!("Playback stopped");
        Ok(())
    }

    /// Move to the next song; state follows from the engine's event
    pub async fn skip_forward(&mut self) -> Result<()> {
        if self.engine.current_item().is_none() {
            return Err(PlaybackError::NoCurrentSong);
        }
        self.engine.advance_to_next();
        Ok(())
    }

    /// Go to the previous song early in the current one, else restart it
    pub async fn skip_backward(&mut self) -> Result<()> {
        if self.engine.current_time() < self.config.skip_back_threshold {
            if let Some(previous) = self.history.pop() {
                return self.go_back_to(previous).await;
            }
        }

        self.seek_to(Duration::ZERO).await
    }

    async fn go_back_to(&mut self, previous: Song) -> Result<()> {
        let item = match self.resolve(&previous).await {
            Ok(item) => item,
            Err(e) => {
                self.alert(format!("Couldn't play \"{}\"", previous.title));
                self.history.push(previous);
                return Err(e);
            }
        };

        let mut items = vec![item];
        self.songs.insert(items[0].reference.clone(), previous);

        // Fresh copy so skipping forward again returns to the current song
        if let Some(current) = self.current.as_ref().map(|c| c.song.clone()) {
            match self.resolve(&current).await {
                Ok(copy) => {
                    self.songs.insert(copy.reference.clone(), current);
                    items.push(copy);
                }
                Err(e) => warn!(song_id = %current.id, error = %e, "Current song not re-queued"),
            }
        }

        if self.engine.current_item().is_some() {
            self.engine.append(items, InsertPosition::Next)?;
            self.engine.advance_to_next();
        } else {
            self.ensure_session_active()?;
            self.engine.append(items, InsertPosition::Next)?;
            self.engine.play();
            self.set_transport(TransportState::Playing);
        }

        self.emit(PlayerEvent::HistoryChanged {
            len: self.history.len(),
        });
        self.publish();
        Ok(())
    }

    /// Seek to a fraction (0.0..=1.0) of the current song's runtime
    pub async fn seek_to_percent(&mut self, percent: f64) -> Result<()> {
        let runtime = self
            .current
            .as_ref()
            .ok_or(PlaybackError::NoCurrentSong)?
            .song
            .runtime;
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 1.0)
        } else {
            0.0
        };

        self.seek_to(runtime.mul_f64(percent)).await
    }

    pub async fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.engine.current_item().is_none() {
            return Err(PlaybackError::NoCurrentSong);
        }

        self.engine.seek(position, self.config.seek_tolerance)?;
        let running = self.clock.is_running();
        self.clock.reset(position, running);
        self.refresh_now_playing();
        self.send_progress().await;
        Ok(())
    }

    /// Periodic progress report, resynchronized with the engine
    pub async fn report_progress(&mut self) {
        let playing = self.engine.current_item().map(|i| i.key);
        if playing.is_some() && playing == self.current.as_ref().map(|c| c.key) {
            let running = self.clock.is_running();
            self.clock.reset(self.engine.current_time(), running);
        }
        self.send_progress().await;
    }

    // ===== Platform events =====

    pub async fn handle_session_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::InterruptionBegan => {
                info!("Audio session interrupted");
                // The platform deactivates the session for the interruption
                if self.session_state == SessionState::Active {
                    self.set_session(SessionState::Configured);
                }
                if self.transport == TransportState::Playing {
                    self.pause().await?;
                    self.paused_by_interruption = true;
                }
            }
            SessionEvent::InterruptionEnded { should_resume } => {
                let resume = should_resume && self.paused_by_interruption;
                self.paused_by_interruption = false;
                info!(resume, "Audio session interruption ended");
                if resume {
                    self.resume().await?;
                }
            }
        }
        self.publish();
        Ok(())
    }

    pub async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::CurrentItemChanged { previous, next } => {
                self.on_item_changed(previous, next).await;
            }
            EngineEvent::RateChanged(rate) => {
                debug!(rate, "Engine rate changed");
                if rate > 0.0 {
                    self.clock.resume();
                } else {
                    self.clock.pause();
                }
                self.refresh_now_playing();
            }
            EngineEvent::StatusChanged(status) => {
                debug!(?status, "Engine status changed");
                if status == EngineStatus::Failed {
                    let title = self.current.as_ref().map(|c| c.song.title.clone());
                    error!(?title, "Engine failed to load the current song");
                    if let Some(title) = title {
                        self.alert(format!("Couldn't play \"{title}\""));
                    }
                }
                self.refresh_now_playing();
            }
            EngineEvent::WaitingReasonChanged(reason) => {
                let buffering = matches!(
                    reason,
                    Some(WaitingReason::Buffering | WaitingReason::NetworkStalled)
                );
                if buffering != self.buffering {
                    debug!(?reason, "Buffering changed");
                    self.buffering = buffering;
                    self.emit(PlayerEvent::BufferingChanged(buffering));
                }
                self.refresh_now_playing();
            }
            EngineEvent::ItemFailed { item, message } => {
                let title = self
                    .songs
                    .get(&item.reference)
                    .map_or_else(|| item.reference.clone(), |s| s.title.clone());
                error!(reference = %item.reference, %message, "Engine item failed");
                self.alert(format!("Couldn't play \"{title}\": {message}"));
            }
        }
        self.publish();
    }

    async fn on_item_changed(&mut self, previous: Option<EngineItem>, next: Option<EngineItem>) {
        let before = self.current.as_ref().map(|c| c.song.id.clone());

        let is_outgoing = match (&previous, &self.current) {
            (Some(previous), Some(current)) => previous.key == current.key,
            _ => false,
        };
        if is_outgoing {
            self.finish_current().await;
        }

        match next {
            Some(item) => self.start_item(item).await,
            None => {
                self.current = None;
                if self.engine.current_item().is_none() {
                    debug!("Engine queue ran out");
                    self.clock.reset(Duration::ZERO, false);
                    self.deactivate_session();
                    self.set_transport(TransportState::Stopped);
                    self.now_playing.update(None);
                }
            }
        }

        self.refresh_up_next().await;

        let after = self.current.as_ref().map(|c| c.song.id.clone());
        if before != after || is_outgoing {
            self.emit(PlayerEvent::SongChanged {
                previous: before,
                current: self.current.as_ref().map(|c| c.song.clone()),
            });
        }
    }

    async fn start_item(&mut self, item: EngineItem) {
        let Some(song) = self.song_for(&item.reference).await else {
            warn!(reference = %item.reference, "Engine item does not map to a known song");
            self.current = None;
            return;
        };

        let lease = match &item.source {
            MediaSource::Local(_) => self.cache.lease(&song.id),
            MediaSource::Remote(_) => None,
        };

        info!(song_id = %song.id, title = %song.title, local = lease.is_some(), "Now playing");
        let report = self.report_for(&song.id, Duration::ZERO);
        self.current = Some(Current {
            key: item.key,
            song,
            _lease: lease,
        });
        self.clock
            .reset(Duration::ZERO, self.transport == TransportState::Playing);

        if let Err(e) = self.remote.report_playback_started(&report).await {
            warn!(song_id = %report.song_id, error = %e, "Failed to report playback start");
        }
        self.refresh_now_playing();
    }

    /// Report the current song as done and retire it
    async fn finish_current(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };

        let mut position = self.clock.position();
        if !current.song.runtime.is_zero() {
            position = position.min(current.song.runtime);
        }

        let report = self.report_for(&current.song.id, position);
        if let Err(e) = self.remote.report_playback_stopped(&report).await {
            warn!(song_id = %current.song.id, error = %e, "Failed to report playback stop");
        }
        if let Err(e) = self.remote.report_playback_finished(&report).await {
            warn!(song_id = %current.song.id, error = %e, "Failed to report playback finish");
        }

        if position >= self.config.history_threshold {
            debug!(song_id = %current.song.id, ?position, "Adding song to history");
            self.history.push(current.song);
            self.emit(PlayerEvent::HistoryChanged {
                len: self.history.len(),
            });
        }
    }

    /// Rebuild up-next from the engine's queue
    async fn refresh_up_next(&mut self) {
        let items = self.engine.items();
        let playing = self.engine.current_item().map(|i| i.key);

        let mut up_next = Vec::with_capacity(items.len());
        for item in items.iter().filter(|i| Some(i.key) != playing) {
            if let Some(song) = self.song_for(&item.reference).await {
                up_next.push(song);
            }
        }

        let live: HashSet<&str> = items.iter().map(|i| i.reference.as_str()).collect();
        self.songs.retain(|reference, _| live.contains(reference.as_str()));

        if up_next != self.up_next {
            self.up_next = up_next;
            self.emit(PlayerEvent::QueueChanged {
                up_next: self.up_next.len(),
            });
        }
    }

    async fn song_for(&mut self, reference: &str) -> Option<Song> {
        if let Some(song) = self.songs.get(reference) {
            return Some(song.clone());
        }

        match self.catalog.song(&SongId::new(reference)).await {
            Ok(Some(song)) => {
                self.songs.insert(reference.to_string(), song.clone());
                Some(song)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(reference, error = %e, "Catalog lookup failed");
                None
            }
        }
    }

    async fn resolve(&self, song: &Song) -> Result<EngineItem> {
        let source = self
            .cache
            .resolve_local_or_remote(song, self.remote.as_ref(), &self.config.streaming)
            .await
            .map_err(|e| match e {
                CacheError::Remote(remote) => PlaybackError::Remote(remote),
                _ => PlaybackError::SourceUnresolved(song.id.clone()),
            })?;

        Ok(EngineItem::new(song.id.as_str(), source))
    }

    // ===== Session =====

    fn ensure_session_active(&mut self) -> Result<()> {
        if self.session_state == SessionState::Inactive {
            self.session
                .configure()
                .map_err(|e| PlaybackError::SessionConfigurationFailed(e.0))?;
            self.set_session(SessionState::Configured);
        }

        if self.session_state == SessionState::Configured {
            self.session
                .activate()
                .map_err(|e| PlaybackError::SessionActivationFailed(e.0))?;
            self.set_session(SessionState::Active);
        }
        Ok(())
    }

    fn deactivate_session(&mut self) {
        if self.session_state == SessionState::Active {
            if let Err(e) = self.session.deactivate() {
                warn!(error = %e, "Failed to deactivate audio session");
            }
        }
        self.set_session(SessionState::Inactive);
    }

    // ===== Observers =====

    async fn send_progress(&self) {
        let Some(current) = &self.current else {
            return;
        };

        let report = self.report_for(&current.song.id, self.clock.position());
        if let Err(e) = self.remote.report_playback_progress(&report).await {
            warn!(song_id = %report.song_id, error = %e, "Failed to report playback progress");
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn report_for(&self, song_id: &SongId, position: Duration) -> PlaybackReport {
        PlaybackReport {
            song_id: song_id.clone(),
            position,
            is_paused: self.transport != TransportState::Playing,
            volume: (self.engine.volume().clamp(0.0, 1.0) * 100.0).round() as u8,
        }
    }

    fn refresh_now_playing(&mut self) {
        let info = self.current.as_ref().map(|c| NowPlayingInfo {
            title: c.song.title.clone(),
            artist: c.song.artist.clone(),
            album: c.song.album.clone(),
            duration: c.song.runtime,
            elapsed: self.clock.position(),
            rate: if self.transport == TransportState::Playing {
                self.engine.rate()
            } else {
                0.0
            },
            buffering: self.buffering,
        });
        self.now_playing.update(info);
    }

    fn set_transport(&mut self, transport: TransportState) {
        if self.transport != transport {
            debug!(from = ?self.transport, to = ?transport, "Transport state changed");
            self.transport = transport;
            self.emit_state();
        }
    }

    fn set_session(&mut self, session: SessionState) {
        if self.session_state != session {
            debug!(from = ?self.session_state, to = ?session, "Audio session state changed");
            self.session_state = session;
            self.emit_state();
        }
    }

    fn emit_state(&self) {
        self.emit(PlayerEvent::StateChanged {
            transport: self.transport,
            session: self.session_state,
        });
    }

    fn alert(&self, message: String) {
        warn!(%message, "Player alert");
        self.emit(PlayerEvent::Alert { message });
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        self.snapshot.send_replace(PlayerSnapshot {
            current_song: self.current.as_ref().map(|c| c.song.clone()),
            is_playing: self.transport == TransportState::Playing,
            transport: self.transport,
            session: self.session_state,
            history: self.history.to_vec(),
            up_next: self.up_next.clone(),
            buffering: self.buffering,
        });
    }
}
