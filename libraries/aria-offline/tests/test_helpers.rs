//! Test helpers: a scripted remote media service and catalog

#![allow(dead_code)]

use aria_core::{
    Album, AlbumId, CatalogRepository, NotificationBus, PlaybackReport, RemoteError,
    RemoteMediaService, RemoteResult, Song, SongId,
};
use aria_offline::{
    DownloadQueue, DownloadQueueConfig, LocalCache, MemoryQueueStore, QueueStore, RetryPolicy,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn song(id: &str, size: u64) -> Song {
    Song::new(id, id, Duration::from_secs(200), size, "mp3")
}

/// Remote service that writes `size_bytes` zeros for every download
#[derive(Default)]
pub struct FakeRemote {
    failures: Mutex<HashMap<SongId, VecDeque<RemoteError>>>,
    held: Mutex<HashMap<SongId, Arc<Notify>>>,
    sizes: Mutex<HashMap<SongId, u64>>,
    containers: Mutex<HashMap<SongId, String>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<SongId>>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next downloads of `id` with these errors, in order
    pub fn fail_with(&self, id: &str, errors: impl IntoIterator<Item = RemoteError>) {
        self.failures
            .lock()
            .unwrap()
            .entry(SongId::new(id))
            .or_default()
            .extend(errors);
    }

    /// Block downloads of `id` until the returned handle is notified
    pub fn hold(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held
            .lock()
            .unwrap()
            .insert(SongId::new(id), Arc::clone(&gate));
        gate
    }

    /// Write `size` bytes instead of the song's catalog size
    pub fn serve_size(&self, id: &str, size: u64) {
        self.sizes.lock().unwrap().insert(SongId::new(id), size);
    }

    /// Report `container` as the delivered format of `id`
    pub fn serve_container(&self, id: &str, container: &str) {
        self.containers
            .lock()
            .unwrap()
            .insert(SongId::new(id), container.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<SongId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn fetch(&self, song_id: &SongId, destination: &Path) -> RemoteResult<Option<String>> {
        let gate = self.held.lock().unwrap().get(song_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(song_id)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            return Err(error);
        }

        let size = self
            .sizes
            .lock()
            .unwrap()
            .get(song_id)
            .copied()
            .unwrap_or(0);
        tokio::fs::write(destination, vec![0u8; size as usize]).await?;
        Ok(self.containers.lock().unwrap().get(song_id).cloned())
    }
}

#[async_trait]
impl RemoteMediaService for FakeRemote {
    async fn stream_url(&self, song_id: &SongId, bitrate: Option<u32>) -> RemoteResult<Option<String>> {
        Ok(Some(match bitrate {
            Some(kbps) => format!("https://media.test/Audio/{song_id}/universal?maxStreamingBitrate={}", kbps * 1000),
            None => format!("https://media.test/Audio/{song_id}/universal"),
        }))
    }

    async fn download(&self, song_id: &SongId, destination: &Path, _bitrate: Option<u32>) -> RemoteResult<Option<String>> {
        self.calls.lock().unwrap().push(song_id.clone());
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = self.fetch(song_id, destination).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn report_playback_started(&self, _report: &PlaybackReport) -> RemoteResult<()> {
        Ok(())
    }

    async fn report_playback_progress(&self, _report: &PlaybackReport) -> RemoteResult<()> {
        Ok(())
    }

    async fn report_playback_stopped(&self, _report: &PlaybackReport) -> RemoteResult<()> {
        Ok(())
    }

    async fn report_playback_finished(&self, _report: &PlaybackReport) -> RemoteResult<()> {
        Ok(())
    }

    async fn set_favorite(&self, _item_id: &str, _favorite: bool) -> RemoteResult<()> {
        Ok(())
    }
}

/// Catalog holding a fixed set of albums
#[derive(Default)]
pub struct FakeCatalog {
    pub albums: HashMap<AlbumId, Vec<Song>>,
}

#[async_trait]
impl CatalogRepository for FakeCatalog {
    async fn songs_in_album(&self, album_id: &AlbumId) -> RemoteResult<Vec<Song>> {
        let mut songs = self.albums.get(album_id).cloned().unwrap_or_default();
        songs.sort_by_key(Song::album_position);
        Ok(songs)
    }

    async fn song(&self, id: &SongId) -> RemoteResult<Option<Song>> {
        Ok(self
            .albums
            .values()
            .flatten()
            .find(|s| &s.id == id)
            .cloned())
    }

    async fn album(&self, id: &AlbumId) -> RemoteResult<Option<Album>> {
        Ok(self.albums.get(id).map(|songs| Album {
            id: id.clone(),
            name: id.to_string(),
            artist: None,
            song_count: songs.len() as u32,
        }))
    }
}

/// Queue wired to a temp cache and a fake remote
pub struct Harness {
    pub queue: DownloadQueue,
    pub cache: LocalCache,
    pub remote: Arc<FakeRemote>,
    pub bus: NotificationBus,
    pub dir: TempDir,
}

pub fn test_config() -> DownloadQueueConfig {
    DownloadQueueConfig {
        max_concurrent: 1,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        },
        ..DownloadQueueConfig::default()
    }
}

impl Harness {
    pub async fn new(quota: u64) -> Self {
        Self::with(quota, test_config(), Arc::new(MemoryQueueStore::new())).await
    }

    pub async fn with(quota: u64, config: DownloadQueueConfig, store: Arc<dyn QueueStore>) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let bus = NotificationBus::default();
        let cache = LocalCache::open(dir.path().join("cache"), quota, bus.clone())
            .await
            .unwrap();
        let remote = FakeRemote::new();
        let queue = DownloadQueue::open(cache.clone(), remote.clone(), store, bus.clone(), config)
            .await
            .unwrap();

        Self {
            queue,
            cache,
            remote,
            bus,
            dir,
        }
    }

    /// Register a song whose download writes exactly `size` bytes
    pub fn song(&self, id: &str, size: u64) -> Song {
        self.remote.serve_size(id, size);
        song(id, size)
    }

    /// Wait until the remote has seen `n` download calls
    pub async fn calls_reach(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.remote.calls().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("download was never started");
    }

    /// Wait until the worker has stopped
    pub async fn idle(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.queue.is_processing().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("download worker did not go idle");
    }
}
