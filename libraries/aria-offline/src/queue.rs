//! Download queue
//!
//! Durable, deduplicated set of pending song downloads feeding the
//! [`LocalCache`]. A single worker task drains it with bounded concurrency:
//! admission check, fetch into a partial file, membership check, commit,
//! notification. Failures never stall the queue; the worker moves on to the
//! next eligible entry.

use crate::cache::{LocalCache, Reservation};
use crate::entry::{sort_for_download, DownloadEntry};
use crate::error::{CacheError, DownloadError, Result};
use crate::retry::RetryPolicy;
use crate::store::QueueStore;
use aria_core::{
    AlbumId, CatalogRepository, DownloadSettings, Notification, NotificationBus, RemoteError,
    RemoteMediaService, Song, SongId,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{watch, Mutex, Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Download queue settings
#[derive(Debug, Clone)]
pub struct DownloadQueueConfig {
    /// Concurrent fetches
    pub max_concurrent: usize,
    pub retry: RetryPolicy,
    /// Bitrate requested for new entries; `None` keeps the original file
    pub bitrate: Option<u32>,
}

impl DownloadQueueConfig {
    pub fn from_settings(downloads: &DownloadSettings) -> Self {
        Self {
            max_concurrent: downloads.max_concurrent_downloads.max(1),
            retry: RetryPolicy {
                max_attempts: downloads.max_attempts,
                base_delay: downloads.base_backoff(),
                max_delay: downloads.max_backoff(),
            },
            bitrate: downloads.bitrate,
        }
    }
}

impl Default for DownloadQueueConfig {
    fn default() -> Self {
        Self::from_settings(&DownloadSettings::default())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    entries: HashMap<SongId, DownloadEntry>,
    in_flight: HashMap<SongId, CancellationToken>,
    next_sequence: i64,
    /// Whether a worker task owns the queue
    running: bool,
}

impl QueueState {
    fn ordered(&self) -> Vec<DownloadEntry> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        sort_for_download(&mut entries);
        entries
    }
}

/// Result of processing one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Cancelled,
    /// Not admitted this pass; attempts untouched
    Skipped,
    Failed,
    Parked,
    AuthRequired,
}

enum Pick {
    Start(DownloadEntry, Reservation, CancellationToken),
    /// Nothing startable now; earliest back-off expiry if any
    Wait(Option<DateTime<Utc>>),
    Done,
}

struct Inner {
    cache: LocalCache,
    remote: Arc<dyn RemoteMediaService>,
    store: Arc<dyn QueueStore>,
    bus: NotificationBus,
    config: DownloadQueueConfig,
    state: Mutex<QueueState>,
    snapshot: watch::Sender<Vec<DownloadEntry>>,
    wake: Notify,
    worker: StdMutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// Durable queue of pending downloads
///
/// Cheap to clone; all clones drive the same queue.
#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DownloadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadQueue")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl DownloadQueue {
    /// Restore the queue from `store`
    ///
    /// Entries whose song is already cached are dropped. Processing does not
    /// start until [`start_processing`](Self::start_processing) or the next
    /// enqueue.
    pub async fn open(
        cache: LocalCache,
        remote: Arc<dyn RemoteMediaService>,
        store: Arc<dyn QueueStore>,
        bus: NotificationBus,
        config: DownloadQueueConfig,
    ) -> Result<Self> {
        let mut state = QueueState::default();

        for entry in store.load().await? {
            state.next_sequence = state.next_sequence.max(entry.sequence + 1);

            if cache.contains(entry.song_id()) {
                debug!(song_id = %entry.song_id(), "Dropping restored entry, song already cached");
                store.remove(entry.song_id()).await?;
                continue;
            }
            state.entries.insert(entry.song_id().clone(), entry);
        }

        info!(pending = state.entries.len(), "Restored download queue");

        let (snapshot, _) = watch::channel(state.ordered());
        Ok(Self {
            inner: Arc::new(Inner {
                cache,
                remote,
                store,
                bus,
                config,
                state: Mutex::new(state),
                snapshot,
                wake: Notify::new(),
                worker: StdMutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Queue songs for download
    ///
    /// Songs already queued or already cached are ignored. Returns how many
    /// entries were added.
    pub async fn enqueue(&self, songs: impl IntoIterator<Item = Song>) -> Result<usize> {
        let mut added = 0;

        {
            let mut state = self.inner.state.lock().await;

            for song in songs {
                if state.entries.contains_key(&song.id) {
                    debug!(song_id = %song.id, "Already queued");
                    continue;
                }
                if self.inner.cache.contains(&song.id) {
                    debug!(song_id = %song.id, "Already cached");
                    continue;
                }

                let entry = DownloadEntry::new(song, self.inner.config.bitrate, state.next_sequence);
                state.next_sequence += 1;

                if self.inner.store.insert(&entry).await? {
                    debug!(song_id = %entry.song_id(), "Queued download");
                    state.entries.insert(entry.song_id().clone(), entry);
                    added += 1;
                }
            }

            if added > 0 {
                self.publish(&state);
                self.ensure_worker(&mut state);
            }
        }

        if added > 0 {
            info!(added, "Enqueued downloads");
        }
        Ok(added)
    }

    /// Queue every song of an album
    pub async fn enqueue_album(
        &self,
        catalog: &dyn CatalogRepository,
        album_id: &AlbumId,
    ) -> Result<usize> {
        let songs = catalog.songs_in_album(album_id).await?;
        if songs.is_empty() {
            return Err(DownloadError::NotFound(format!("album {album_id}")));
        }
        self.enqueue(songs).await
    }

    /// Start the worker if it is not running
    pub async fn start_processing(&self) {
        let mut state = self.inner.state.lock().await;
        self.ensure_worker(&mut state);
    }

    /// Remove an entry, cancelling its fetch if one is in flight
    ///
    /// Returns `false` if the song was not queued.
    pub async fn cancel(&self, song_id: &SongId) -> Result<bool> {
        let mut state = self.inner.state.lock().await;

        if let Some(token) = state.in_flight.get(song_id) {
            token.cancel();
        }

        if state.entries.remove(song_id).is_none() {
            return Ok(false);
        }

        self.inner.store.remove(song_id).await?;
        self.publish(&state);
        info!(song_id = %song_id, "Cancelled download");
        Ok(true)
    }

    /// Remove every entry and cancel all in-flight fetches
    pub async fn cancel_all(&self) -> Result<usize> {
        let mut state = self.inner.state.lock().await;

        for token in state.in_flight.values() {
            token.cancel();
        }

        let count = state.entries.len();
        state.entries.clear();
        self.inner.store.clear().await?;
        self.publish(&state);

        info!(count, "Cancelled all downloads");
        Ok(count)
    }

    /// Give parked entries a fresh set of attempts
    pub async fn retry_failed(&self) -> Result<usize> {
        let mut state = self.inner.state.lock().await;
        let retry = self.inner.config.retry;

        let parked: Vec<SongId> = state
            .entries
            .values()
            .filter(|e| retry.is_exhausted(e.attempts))
            .map(|e| e.song_id().clone())
            .collect();

        for id in &parked {
            if let Some(entry) = state.entries.get_mut(id) {
                entry.attempts = 0;
                entry.last_error = None;
                entry.next_attempt_at = None;
                self.inner.store.update(entry).await?;
            }
        }

        if !parked.is_empty() {
            self.publish(&state);
            self.ensure_worker(&mut state);
            info!(count = parked.len(), "Retrying parked downloads");
        }
        Ok(parked.len())
    }

    /// Pending entries in download order
    pub fn entries(&self) -> Vec<DownloadEntry> {
        self.inner.snapshot.borrow().clone()
    }

    /// Entries that exhausted their attempts
    pub fn parked(&self) -> Vec<DownloadEntry> {
        let retry = self.inner.config.retry;
        self.entries()
            .into_iter()
            .filter(|e| retry.is_exhausted(e.attempts))
            .collect()
    }

    /// Observe the queue; a new value is published on every change
    pub fn subscribe(&self) -> watch::Receiver<Vec<DownloadEntry>> {
        self.inner.snapshot.subscribe()
    }

    pub async fn is_processing(&self) -> bool {
        self.inner.state.lock().await.running
    }

    /// Stop the worker and cancel in-flight fetches
    ///
    /// Entries stay persisted and resume after the next `open`.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let handle = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Download worker panicked");
            }
        }
        info!("Download queue shut down");
    }

    fn publish(&self, state: &QueueState) {
        self.inner.snapshot.send_replace(state.ordered());
    }

    fn ensure_worker(&self, state: &mut QueueState) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        if state.running {
            self.inner.wake.notify_one();
            return;
        }

        state.running = true;
        let queue = self.clone();
        let handle = tokio::spawn(async move { queue.run().await });
        *self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    async fn run(self) {
        let inner = &self.inner;
        let semaphore = Arc::new(Semaphore::new(inner.config.max_concurrent.max(1)));
        let mut tasks: JoinSet<(SongId, Outcome)> = JoinSet::new();
        let mut skipped: HashSet<SongId> = HashSet::new();
        let mut auth_blocked = false;

        info!(
            max_concurrent = inner.config.max_concurrent,
            "Download worker started"
        );

        loop {
            if inner.shutdown.is_cancelled() {
                break;
            }

            if auth_blocked && tasks.is_empty() {
                warn!("Download worker stopped, authentication required");
                inner.state.lock().await.running = false;
                break;
            }

            let mut wait_until = None;
            if !auth_blocked {
                if let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() {
                    match self.pick(&mut skipped, !tasks.is_empty()).await {
                        Pick::Start(entry, reservation, token) => {
                            let queue = self.clone();
                            tasks.spawn(async move {
                                let _permit = permit;
                                let id = entry.song_id().clone();
                                let outcome = queue.process(entry, reservation, token).await;
                                (id, outcome)
                            });
                            continue;
                        }
                        Pick::Wait(until) => wait_until = until,
                        Pick::Done => break,
                    }
                }
            }

            let backoff = async {
                match wait_until {
                    Some(at) => {
                        let delay = (at - Utc::now()).to_std().unwrap_or_default();
                        tokio::time::sleep(delay).await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                () = inner.shutdown.cancelled() => break,
                () = inner.wake.notified() => {
                    // New work arrived; give skipped entries another chance
                    skipped.clear();
                }
                Some(joined) = tasks.join_next() => {
                    // Anything but a commit hands its reserved bytes back,
                    // so entries refused for quota may fit now
                    if !matches!(joined, Ok((_, Outcome::Completed))) {
                        skipped.clear();
                    }
                    match joined {
                        Ok((id, Outcome::Skipped)) => {
                            skipped.insert(id);
                        }
                        Ok((_, Outcome::AuthRequired)) => auth_blocked = true,
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Download task failed"),
                    }
                }
                () = backoff => {}
            }
        }

        tasks.shutdown().await;
        if inner.shutdown.is_cancelled() {
            inner.state.lock().await.running = false;
        }
        info!("Download worker stopped");
    }

    /// Choose the next entry to fetch and reserve cache space for it
    async fn pick(&self, skipped: &mut HashSet<SongId>, has_tasks: bool) -> Pick {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        let now = Utc::now();
        let retry = inner.config.retry;

        let mut earliest: Option<DateTime<Utc>> = None;
        for entry in state.ordered() {
            let id = entry.song_id();
            if state.in_flight.contains_key(id)
                || skipped.contains(id)
                || retry.is_exhausted(entry.attempts)
            {
                continue;
            }

            if !entry.is_due(now) {
                if let Some(at) = entry.next_attempt_at {
                    earliest = Some(earliest.map_or(at, |e| e.min(at)));
                }
                continue;
            }

            match inner.cache.reserve(&entry.song) {
                Ok(reservation) => {
                    let token = inner.shutdown.child_token();
                    state.in_flight.insert(id.clone(), token.clone());
                    return Pick::Start(entry, reservation, token);
                }
                Err(e) => {
                    warn!(song_id = %id, error = %e, "Skipping download for this pass");
                    skipped.insert(id.clone());
                }
            }
        }

        if earliest.is_none() && !has_tasks {
            state.running = false;
            return Pick::Done;
        }
        Pick::Wait(earliest)
    }

    async fn process(
        &self,
        entry: DownloadEntry,
        reservation: Reservation,
        token: CancellationToken,
    ) -> Outcome {
        let id = entry.song_id().clone();
        let outcome = self.download(&entry, reservation, &token).await;
        self.inner.state.lock().await.in_flight.remove(&id);
        outcome
    }

    async fn download(
        &self,
        entry: &DownloadEntry,
        reservation: Reservation,
        token: &CancellationToken,
    ) -> Outcome {
        let inner = &self.inner;
        let song = &entry.song;
        let temp = inner.cache.partial_path(song);

        debug!(song_id = %song.id, bitrate = ?entry.bitrate, "Downloading");

        let fetched = tokio::select! {
            biased;
            () = token.cancelled() => Err(RemoteError::Cancelled),
            result = inner.remote.download(&song.id, &temp, entry.bitrate) => result,
        };

        match fetched {
            Ok(container) => {
                self.commit(entry, reservation, container.as_deref(), token)
                    .await
            }
            Err(RemoteError::Cancelled) => {
                discard(&temp).await;
                debug!(song_id = %song.id, "Download cancelled in flight");
                Outcome::Cancelled
            }
            Err(RemoteError::AuthRequired) => {
                discard(&temp).await;
                warn!(song_id = %song.id, "Download needs re-authentication");
                Outcome::AuthRequired
            }
            Err(e) => {
                discard(&temp).await;
                self.record_failure(entry, &e.to_string(), e.is_transient())
                    .await
            }
        }
    }

    async fn commit(
        &self,
        entry: &DownloadEntry,
        reservation: Reservation,
        container: Option<&str>,
        token: &CancellationToken,
    ) -> Outcome {
        let inner = &self.inner;
        let song = &entry.song;
        let temp = inner.cache.partial_path(song);
        // A transcoded copy the server did not label is stored as unknown
        let extension = match (container, entry.bitrate) {
            (Some(container), _) => container,
            (None, None) => song.container.as_str(),
            (None, Some(_)) => "",
        };

        // Hold the queue lock so a concurrent cancel cannot slip in between
        // the membership check and the commit
        let mut state = inner.state.lock().await;

        if token.is_cancelled() || !state.entries.contains_key(&song.id) {
            drop(state);
            discard(&temp).await;
            debug!(song_id = %song.id, "Discarding download of cancelled entry");
            return Outcome::Cancelled;
        }

        match reservation.commit(&temp, extension).await {
            Ok(cached) => {
                state.entries.remove(&song.id);
                if let Err(e) = inner.store.remove(&song.id).await {
                    error!(song_id = %song.id, error = %e, "Failed to remove completed entry from store");
                }
                self.publish(&state);
                drop(state);

                info!(song_id = %song.id, size = cached.size_bytes, "Download complete");
                inner
                    .bus
                    .publish(Notification::SongDownloaded(song.id.clone()));
                Outcome::Completed
            }
            Err(CacheError::QuotaExceeded { needed, available }) => {
                warn!(song_id = %song.id, needed, available, "Downloaded file exceeds quota");
                Outcome::Skipped
            }
            Err(e) => {
                drop(state);
                self.record_failure(entry, &e.to_string(), e.is_transient())
                    .await
            }
        }
    }

    async fn record_failure(&self, entry: &DownloadEntry, reason: &str, transient: bool) -> Outcome {
        let inner = &self.inner;
        let retry = inner.config.retry;
        let mut state = inner.state.lock().await;

        let Some(current) = state.entries.get_mut(entry.song_id()) else {
            return Outcome::Cancelled;
        };

        current.attempts = if transient {
            current.attempts + 1
        } else {
            retry.max_attempts.max(current.attempts + 1)
        };
        current.last_error = Some(reason.to_string());

        let parked = retry.is_exhausted(current.attempts);
        current.next_attempt_at = if parked {
            None
        } else {
            chrono::Duration::from_std(retry.delay_for(current.attempts))
                .ok()
                .map(|delay| Utc::now() + delay)
        };

        let updated = current.clone();
        if let Err(e) = inner.store.update(&updated).await {
            error!(song_id = %updated.song_id(), error = %e, "Failed to persist retry state");
        }
        self.publish(&state);
        drop(state);

        if parked {
            error!(
                song_id = %updated.song_id(),
                attempts = updated.attempts,
                error = reason,
                "Download failed permanently"
            );
            inner.bus.publish(Notification::DownloadFailed {
                song_id: updated.song_id().clone(),
                reason: reason.to_string(),
            });
            Outcome::Parked
        } else {
            warn!(
                song_id = %updated.song_id(),
                attempts = updated.attempts,
                retry_at = ?updated.next_attempt_at,
                error = reason,
                "Download failed, will retry"
            );
            Outcome::Failed
        }
    }
}

async fn discard(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
}
