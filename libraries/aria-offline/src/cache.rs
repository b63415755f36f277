//! Local cache store
//!
//! Maps song identifiers to audio files under one directory and enforces a
//! byte quota. The directory itself is the index: every cached file is named
//! `hex(song id).extension`, so reopening the cache rebuilds its state with a
//! single scan.
//!
//! All removals go through [`LocalCache`]. A song leased for local playback
//! disappears from the index immediately when removed, but its file is only
//! deleted once the last [`CacheLease`] is dropped.

use crate::error::CacheError;
use aria_core::{
    MediaSource, Notification, NotificationBus, RemoteMediaService, Song, SongId,
    StreamingSettings,
};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::fs;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, CacheError>;

/// Subdirectory holding in-flight downloads
const PARTIAL_DIR: &str = ".partial";

/// Extension used when a song reports no container
const UNKNOWN_EXTENSION: &str = "bin";

/// A cached audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub song_id: SongId,
    pub path: PathBuf,
    pub extension: String,
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<SongId, CacheEntry>,
    quota: u64,
    /// Bytes promised to admitted but uncommitted downloads
    reserved: u64,
    /// Active lease count per song
    leases: HashMap<SongId, usize>,
    /// Files removed from the index while leased
    deferred: HashMap<SongId, Vec<PathBuf>>,
}

impl CacheState {
    fn current_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    fn available(&self) -> u64 {
        self.quota
            .saturating_sub(self.current_size() + self.reserved)
    }

    /// Detach an entry's file from the index, deferring deletion while leased
    fn detach(&mut self, entry: CacheEntry) -> Option<PathBuf> {
        if self.leases.contains_key(&entry.song_id) {
            self.deferred
                .entry(entry.song_id)
                .or_default()
                .push(entry.path);
            None
        } else {
            Some(entry.path)
        }
    }
}

struct Shared {
    root: PathBuf,
    partial_dir: PathBuf,
    state: Mutex<CacheState>,
    bus: NotificationBus,
}

/// Size-bounded store of downloaded audio
///
/// Cheap to clone; clones share the same directory and bookkeeping.
#[derive(Clone)]
pub struct LocalCache {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("root", &self.shared.root)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Open (or create) a cache rooted at `root`
    ///
    /// Leftover partial downloads from a previous process are discarded and
    /// the directory is scanned to rebuild the index.
    pub async fn open(
        root: impl Into<PathBuf>,
        quota: u64,
        bus: NotificationBus,
    ) -> Result<Self> {
        let root = root.into();
        let partial_dir = root.join(PARTIAL_DIR);

        fs::create_dir_all(&root).await?;
        if fs::try_exists(&partial_dir).await? {
            fs::remove_dir_all(&partial_dir).await?;
        }
        fs::create_dir_all(&partial_dir).await?;

        let entries = scan(&root).await?;
        let cache = Self {
            shared: Arc::new(Shared {
                root,
                partial_dir,
                state: Mutex::new(CacheState {
                    entries,
                    quota,
                    ..CacheState::default()
                }),
                bus,
            }),
        };

        info!(
            root = %cache.shared.root.display(),
            entries = cache.len(),
            size = cache.current_size(),
            quota,
            "Opened local cache"
        );

        Ok(cache)
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// Total bytes of committed entries
    pub fn current_size(&self) -> u64 {
        self.state().current_size()
    }

    pub fn quota(&self) -> u64 {
        self.state().quota
    }

    /// Change the quota
    ///
    /// Only affects future admissions; nothing already cached is evicted.
    pub fn set_quota(&self, quota: u64) {
        self.state().quota = quota;
        info!(quota, "Cache quota updated");
    }

    /// Bytes still admissible (quota minus committed and reserved bytes)
    pub fn available(&self) -> u64 {
        self.state().available()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    pub fn contains(&self, song_id: &SongId) -> bool {
        self.state().entries.contains_key(song_id)
    }

    pub fn entry(&self, song_id: &SongId) -> Option<CacheEntry> {
        self.state().entries.get(song_id).cloned()
    }

    /// All entries, ordered by song id
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<_> = self.state().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.song_id.cmp(&b.song_id));
        entries
    }

    /// Temporary destination for fetching `song`
    pub fn partial_path(&self, song: &Song) -> PathBuf {
        self.shared
            .partial_dir
            .join(format!("{}.part", hex::encode(song.id.as_str())))
    }

    /// Resolve a song to a local file, or to a streaming URL when not cached
    pub async fn resolve_local_or_remote(
        &self,
        song: &Song,
        remote: &dyn RemoteMediaService,
        policy: &StreamingSettings,
    ) -> Result<MediaSource> {
        if let Some(entry) = self.entry(&song.id) {
            if fs::try_exists(&entry.path).await.unwrap_or(false) {
                return Ok(MediaSource::Local(entry.path));
            }

            warn!(song_id = %song.id, path = %entry.path.display(), "Cached file vanished, dropping entry");
            self.forget(&song.id, &entry.path);
        }

        let bitrate = policy.bitrate_for(song);
        match remote.stream_url(&song.id, bitrate).await? {
            Some(url) => Ok(MediaSource::Remote(url)),
            None => Err(CacheError::SourceUnresolved(song.id.clone())),
        }
    }

    /// Admission check
    ///
    /// Reserves `song.size_bytes` so concurrent downloads cannot jointly
    /// overshoot the quota. The reservation is released when committed or
    /// dropped.
    pub fn reserve(&self, song: &Song) -> Result<Reservation> {
        let mut state = self.state();
        let available = state.available();

        if song.size_bytes > available {
            return Err(CacheError::QuotaExceeded {
                needed: song.size_bytes,
                available,
            });
        }

        state.reserved += song.size_bytes;
        Ok(Reservation {
            cache: self.clone(),
            song_id: song.id.clone(),
            bytes: song.size_bytes,
        })
    }

    /// Move a fully fetched file into the cache
    ///
    /// Performs the admission check first. On any failure the temporary file
    /// is removed.
    pub async fn write(&self, song: &Song, temp_path: &Path) -> Result<CacheEntry> {
        let reservation = match self.reserve(song) {
            Ok(reservation) => reservation,
            Err(e) => {
                discard(temp_path).await;
                return Err(e);
            }
        };

        reservation.commit(temp_path, &song.container).await
    }

    async fn commit(
        &self,
        song_id: &SongId,
        temp_path: &Path,
        extension: &str,
        reserved: u64,
    ) -> Result<CacheEntry> {
        let size = match fs::metadata(temp_path).await {
            Ok(meta) => meta.len(),
            Err(source) => {
                self.release(reserved);
                discard(temp_path).await;
                return Err(CacheError::WriteFailed {
                    song_id: song_id.clone(),
                    source,
                });
            }
        };

        // Swap the estimate for the real size, re-checking the quota
        let admitted = {
            let mut state = self.state();
            state.reserved = state.reserved.saturating_sub(reserved);

            let replaced = state.entries.get(song_id).map_or(0, |e| e.size_bytes);
            let used = state.current_size() - replaced + state.reserved;
            let available = state.quota.saturating_sub(used);

            if size > available {
                Err(CacheError::QuotaExceeded {
                    needed: size,
                    available,
                })
            } else {
                state.reserved += size;
                Ok(())
            }
        };

        if let Err(e) = admitted {
            discard(temp_path).await;
            return Err(e);
        }

        let extension = if extension.is_empty() {
            UNKNOWN_EXTENSION
        } else {
            extension
        };
        let path = self.shared.root.join(file_name(song_id, extension));
        let renamed = fs::rename(temp_path, &path).await;

        if let Err(source) = renamed {
            self.release(size);
            discard(temp_path).await;
            return Err(CacheError::WriteFailed {
                song_id: song_id.clone(),
                source,
            });
        }

        let entry = CacheEntry {
            song_id: song_id.clone(),
            path: path.clone(),
            extension: extension.to_string(),
            size_bytes: size,
        };

        let stale = {
            let mut state = self.state();
            state.reserved = state.reserved.saturating_sub(size);
            state
                .entries
                .insert(song_id.clone(), entry.clone())
                .filter(|previous| previous.path != path)
                .and_then(|previous| state.detach(previous))
        };

        if let Some(stale) = stale {
            delete_file(&stale).await?;
        }

        debug!(song_id = %song_id, size, path = %path.display(), "Committed cache entry");
        Ok(entry)
    }

    fn release(&self, bytes: u64) {
        let mut state = self.state();
        state.reserved = state.reserved.saturating_sub(bytes);
    }

    /// Drop an entry whose file no longer exists
    fn forget(&self, song_id: &SongId, path: &Path) {
        let removed = {
            let mut state = self.state();
            if state.entries.get(song_id).is_some_and(|e| e.path == path) {
                state.entries.remove(song_id)
            } else {
                None
            }
        };

        if removed.is_some() {
            self.shared
                .bus
                .publish(Notification::SongFileDeleted(song_id.clone()));
        }
    }

    /// Remove a song's file
    ///
    /// Idempotent: removing an uncached song is not an error and publishes
    /// nothing.
    pub async fn remove(&self, song_id: &SongId) -> Result<()> {
        let (entry, to_delete) = {
            let mut state = self.state();
            let Some(entry) = state.entries.remove(song_id) else {
                return Ok(());
            };
            let to_delete = state.detach(entry.clone());
            (entry, to_delete)
        };

        if let Some(path) = to_delete {
            if let Err(e) = delete_file(&path).await {
                // Keep the index consistent with the directory
                self.state().entries.insert(song_id.clone(), entry);
                return Err(e);
            }
        } else {
            debug!(song_id = %song_id, "Song is leased, deferring file deletion");
        }

        info!(song_id = %song_id, "Removed song from cache");
        self.shared
            .bus
            .publish(Notification::SongFileDeleted(song_id.clone()));
        Ok(())
    }

    /// Remove every cached song
    pub async fn remove_all(&self) -> Result<()> {
        let ids: Vec<SongId> = self.state().entries.keys().cloned().collect();
        let count = ids.len();

        for id in ids {
            self.remove(&id).await?;
        }

        let swept = self.sweep_unindexed().await?;
        info!(count, swept, "Cleared local cache");
        Ok(())
    }

    /// Delete top-level files the index does not own
    ///
    /// Duplicates and foreign files survive a scan; leased files waiting for
    /// deferred deletion and in-flight partials are left alone.
    async fn sweep_unindexed(&self) -> Result<usize> {
        let mut swept = 0;
        let mut dir = fs::read_dir(&self.shared.root).await?;

        while let Some(item) = dir.next_entry().await? {
            if !item.file_type().await?.is_file() {
                continue;
            }

            let path = item.path();
            let owned = {
                let state = self.state();
                state.entries.values().any(|e| e.path == path)
                    || state.deferred.values().flatten().any(|p| p == &path)
            };
            if owned {
                continue;
            }

            debug!(path = %path.display(), "Deleting unindexed cache file");
            delete_file(&path).await?;
            swept += 1;
        }

        Ok(swept)
    }

    /// Mark a cached song as being read for local playback
    ///
    /// Returns `None` when the song is not cached.
    pub fn lease(&self, song_id: &SongId) -> Option<CacheLease> {
        let mut state = self.state();
        if !state.entries.contains_key(song_id) {
            return None;
        }

        *state.leases.entry(song_id.clone()).or_insert(0) += 1;
        Some(CacheLease {
            cache: self.clone(),
            song_id: song_id.clone(),
        })
    }

    pub fn is_leased(&self, song_id: &SongId) -> bool {
        self.state().leases.contains_key(song_id)
    }

    fn release_lease(&self, song_id: &SongId) {
        let paths = {
            let mut state = self.state();
            let remaining = match state.leases.get_mut(song_id) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count
                }
                None => return,
            };

            if remaining > 0 {
                return;
            }
            state.leases.remove(song_id);

            let mut paths = state.deferred.remove(song_id).unwrap_or_default();
            // A re-download may have reused the same file name
            paths.retain(|p| !state.entries.values().any(|e| &e.path == p));
            paths
        };

        for path in paths {
            debug!(song_id = %song_id, path = %path.display(), "Deleting deferred cache file");
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = delete_file(&path).await {
                            warn!(path = %path.display(), error = %e, "Failed to delete deferred file");
                        }
                    });
                }
                Err(_) => {
                    if let Err(e) = std::fs::remove_file(&path) {
                        if e.kind() != ErrorKind::NotFound {
                            warn!(path = %path.display(), error = %e, "Failed to delete deferred file");
                        }
                    }
                }
            }
        }
    }
}

/// Bytes admitted for one in-flight download
#[must_use = "dropping a reservation releases its bytes"]
#[derive(Debug)]
pub struct Reservation {
    cache: LocalCache,
    song_id: SongId,
    bytes: u64,
}

impl Reservation {
    pub fn song_id(&self) -> &SongId {
        &self.song_id
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Move the fetched file at `temp_path` into the cache
    ///
    /// `extension` names the stored container, which differs from the
    /// song's own when the server transcoded the download.
    pub async fn commit(mut self, temp_path: &Path, extension: &str) -> Result<CacheEntry> {
        let bytes = std::mem::take(&mut self.bytes);
        let cache = self.cache.clone();
        let song_id = self.song_id.clone();
        drop(self);

        cache.commit(&song_id, temp_path, extension, bytes).await
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.cache.release(self.bytes);
        }
    }
}

/// Guard exempting a song's file from deletion while it is played locally
#[derive(Debug)]
pub struct CacheLease {
    cache: LocalCache,
    song_id: SongId,
}

impl CacheLease {
    pub fn song_id(&self) -> &SongId {
        &self.song_id
    }
}

impl Drop for CacheLease {
    fn drop(&mut self) {
        self.cache.release_lease(&self.song_id);
    }
}

fn file_name(song_id: &SongId, extension: &str) -> String {
    format!("{}.{}", hex::encode(song_id.as_str()), extension)
}

/// Recover `(song id, extension)` from a cache file name
fn parse_file_name(path: &Path) -> Option<(SongId, String)> {
    let stem = path.file_stem()?.to_str()?;
    let extension = path.extension()?.to_str()?;
    let id = String::from_utf8(hex::decode(stem).ok()?).ok()?;
    Some((SongId::new(id), extension.to_string()))
}

async fn scan(root: &Path) -> Result<HashMap<SongId, CacheEntry>> {
    let mut entries: HashMap<SongId, CacheEntry> = HashMap::new();
    let mut dir = fs::read_dir(root).await?;

    while let Some(item) = dir.next_entry().await? {
        let meta = item.metadata().await?;
        if !meta.is_file() {
            continue;
        }

        let path = item.path();
        let Some((song_id, extension)) = parse_file_name(&path) else {
            debug!(path = %path.display(), "Ignoring foreign file in cache directory");
            continue;
        };

        if let Some(existing) = entries.get(&song_id) {
            warn!(
                song_id = %song_id,
                kept = %existing.path.display(),
                ignored = %path.display(),
                "Duplicate cache file"
            );
            continue;
        }

        entries.insert(
            song_id.clone(),
            CacheEntry {
                song_id,
                path,
                extension,
                size_bytes: meta.len(),
            },
        );
    }

    Ok(entries)
}

async fn delete_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Best-effort removal of a partial artifact
async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    fn song(id: &str, size: u64) -> Song {
        Song::new(id, id, Duration::from_secs(180), size, "mp3")
    }

    async fn open(quota: u64) -> (TempDir, LocalCache, NotificationBus) {
        let dir = tempfile::tempdir().unwrap();
        let bus = NotificationBus::default();
        let cache = LocalCache::open(dir.path().join("cache"), quota, bus.clone())
            .await
            .unwrap();
        (dir, cache, bus)
    }

    async fn fetched(cache: &LocalCache, song: &Song, len: usize) -> PathBuf {
        let path = cache.partial_path(song);
        fs::write(&path, vec![0u8; len]).await.unwrap();
        path
    }

    #[tokio::test]
    async fn write_moves_file_into_place() {
        let (_dir, cache, _bus) = open(MB).await;
        let song = song("song/1", 100);
        let temp = fetched(&cache, &song, 100).await;

        let entry = cache.write(&song, &temp).await.unwrap();

        assert!(!temp.exists());
        assert!(entry.path.exists());
        assert_eq!(entry.extension, "mp3");
        assert_eq!(cache.current_size(), 100);
        assert!(cache.contains(&song.id));
    }

    #[tokio::test]
    async fn reopen_rebuilds_index_from_directory() {
        let (dir, cache, _bus) = open(MB).await;
        let song = song("abc", 42);
        let temp = fetched(&cache, &song, 42).await;
        cache.write(&song, &temp).await.unwrap();

        // Leftover partial from a crashed download
        fs::write(cache.partial_path(&self::song("zzz", 1)), b"x")
            .await
            .unwrap();
        drop(cache);

        let reopened = LocalCache::open(dir.path().join("cache"), MB, NotificationBus::default())
            .await
            .unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.entry(&song.id).unwrap().size_bytes, 42);
        assert!(!reopened.partial_path(&self::song("zzz", 1)).exists());
    }

    #[tokio::test]
    async fn admission_rejects_songs_over_quota() {
        let (_dir, cache, _bus) = open(100 * MB).await;
        let a = song("a", 50 * MB);
        let b = song("b", 80 * MB);

        let reservation = cache.reserve(&a).unwrap();
        assert_eq!(cache.available(), 50 * MB);

        let err = cache.reserve(&b).unwrap_err();
        assert!(matches!(
            err,
            CacheError::QuotaExceeded { needed, available } if needed == 80 * MB && available == 50 * MB
        ));

        drop(reservation);
        assert_eq!(cache.available(), 100 * MB);
    }

    #[tokio::test]
    async fn oversized_commit_is_rejected_and_cleaned_up() {
        let (_dir, cache, _bus) = open(100).await;
        // Catalog under-reported the size
        let song = song("a", 10);
        let temp = fetched(&cache, &song, 150).await;

        let err = cache.write(&song, &temp).await.unwrap_err();

        assert!(matches!(err, CacheError::QuotaExceeded { .. }));
        assert!(!temp.exists());
        assert_eq!(cache.current_size(), 0);
        assert_eq!(cache.available(), 100);
    }

    #[tokio::test]
    async fn missing_temp_file_is_write_failed() {
        let (_dir, cache, _bus) = open(MB).await;
        let song = song("a", 10);

        let err = cache.write(&song, &cache.partial_path(&song)).await.unwrap_err();

        assert!(matches!(err, CacheError::WriteFailed { .. }));
        assert!(err.is_transient());
        assert_eq!(cache.available(), MB);
    }

    #[tokio::test]
    async fn set_quota_does_not_evict() {
        let (_dir, cache, _bus) = open(MB).await;
        let song = song("a", 500);
        let temp = fetched(&cache, &song, 500).await;
        cache.write(&song, &temp).await.unwrap();

        cache.set_quota(100);

        assert!(cache.contains(&song.id));
        assert_eq!(cache.available(), 0);
        assert!(cache.reserve(&self::song("b", 1)).is_err());
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_notifies_once() {
        let (_dir, cache, bus) = open(MB).await;
        let mut rx = bus.subscribe();
        let song = song("a", 10);
        let temp = fetched(&cache, &song, 10).await;
        let entry = cache.write(&song, &temp).await.unwrap();

        cache.remove(&song.id).await.unwrap();
        cache.remove(&song.id).await.unwrap();

        assert!(!entry.path.exists());
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::SongFileDeleted(song.id.clone())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leased_file_survives_removal_until_released() {
        let (_dir, cache, _bus) = open(MB).await;
        let song = song("playing", 10);
        let temp = fetched(&cache, &song, 10).await;
        let entry = cache.write(&song, &temp).await.unwrap();

        let lease = cache.lease(&song.id).unwrap();
        cache.remove(&song.id).await.unwrap();

        // Gone from the index, still readable on disk
        assert!(!cache.contains(&song.id));
        assert_eq!(cache.current_size(), 0);
        assert_eq!(fs::read(&entry.path).await.unwrap().len(), 10);

        drop(lease);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!entry.path.exists());
    }

    #[tokio::test]
    async fn redownload_while_leased_keeps_new_file() {
        let (_dir, cache, _bus) = open(MB).await;
        let song = song("a", 10);
        let temp = fetched(&cache, &song, 10).await;
        cache.write(&song, &temp).await.unwrap();

        let lease = cache.lease(&song.id).unwrap();
        cache.remove(&song.id).await.unwrap();

        let temp = fetched(&cache, &song, 10).await;
        let entry = cache.write(&song, &temp).await.unwrap();
        drop(lease);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(entry.path.exists());
        assert!(cache.contains(&song.id));
    }

    #[tokio::test]
    async fn remove_all_clears_everything() {
        let (_dir, cache, bus) = open(MB).await;
        let mut rx = bus.subscribe();
        for id in ["a", "b", "c"] {
            let song = song(id, 10);
            let temp = fetched(&cache, &song, 10).await;
            cache.write(&song, &temp).await.unwrap();
        }

        cache.remove_all().await.unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
        let mut deleted = 0;
        while rx.try_recv().is_ok() {
            deleted += 1;
        }
        assert_eq!(deleted, 3);
    }

    #[tokio::test]
    async fn remove_all_sweeps_unindexed_files() {
        let (dir, cache, _bus) = open(MB).await;
        let root = dir.path().join("cache");
        let song = song("a", 10);
        let temp = fetched(&cache, &song, 10).await;
        cache.write(&song, &temp).await.unwrap();

        fs::write(root.join(file_name(&song.id, "flac")), b"dup")
            .await
            .unwrap();
        fs::write(root.join("notes.txt"), b"foreign").await.unwrap();

        cache.remove_all().await.unwrap();

        let mut left = Vec::new();
        let mut entries = fs::read_dir(&root).await.unwrap();
        while let Some(item) = entries.next_entry().await.unwrap() {
            left.push(item.file_name());
        }
        assert_eq!(left, vec![std::ffi::OsString::from(PARTIAL_DIR)]);
    }

    #[test]
    fn file_names_round_trip() {
        let id = SongId::new("e5/ü?");
        let name = file_name(&id, "flac");
        let (parsed, ext) = parse_file_name(Path::new(&name)).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(ext, "flac");
        assert!(parse_file_name(Path::new("not-hex.mp3")).is_none());
    }
}
