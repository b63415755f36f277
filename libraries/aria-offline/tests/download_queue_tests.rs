//! Download queue integration tests
//!
//! Real cache directory, scripted remote service.

mod test_helpers;

use aria_core::{AlbumId, Notification, NotificationBus, RemoteError, SongId};
use aria_offline::{
    DownloadQueue, DownloadQueueConfig, LocalCache, MemoryQueueStore, SqliteQueueStore,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{song, test_config, FakeCatalog, FakeRemote, Harness};

/// Scaled-down megabyte so the quota scenario stays fast
const MB: u64 = 1024;

#[tokio::test]
async fn second_song_waits_when_quota_is_exhausted() {
    let h = Harness::new(100 * MB).await;
    let mut notifications = h.bus.subscribe();
    let a = h.song("a", 50 * MB);
    let b = h.song("b", 80 * MB);

    h.queue.enqueue(vec![a.clone(), b.clone()]).await.unwrap();
    h.idle().await;

    assert!(h.cache.contains(&a.id));
    assert!(!h.cache.contains(&b.id));
    assert_eq!(h.cache.current_size(), 50 * MB);

    // B stays queued without burning an attempt
    let entries = h.queue.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].song_id(), &b.id);
    assert_eq!(entries[0].attempts, 0);
    assert_eq!(h.remote.calls(), vec![a.id.clone()]);

    assert_eq!(
        notifications.recv().await.unwrap(),
        Notification::SongDownloaded(a.id.clone())
    );
}

#[tokio::test]
async fn skipped_entry_is_retried_after_space_frees_up() {
    let h = Harness::new(100 * MB).await;
    let a = h.song("a", 50 * MB);
    let b = h.song("b", 80 * MB);

    h.queue.enqueue(vec![a.clone(), b.clone()]).await.unwrap();
    h.idle().await;

    h.cache.remove(&a.id).await.unwrap();
    h.queue.start_processing().await;
    h.idle().await;

    assert!(h.cache.contains(&b.id));
    assert!(h.queue.entries().is_empty());
}

#[tokio::test]
async fn enqueue_is_idempotent() {
    let h = Harness::new(100 * MB).await;
    let gate = h.remote.hold("a");
    let a = h.song("a", MB);

    assert_eq!(h.queue.enqueue(vec![a.clone(), a.clone()]).await.unwrap(), 1);
    assert_eq!(h.queue.enqueue(vec![a.clone()]).await.unwrap(), 0);
    assert_eq!(h.queue.entries().len(), 1);

    gate.notify_one();
    h.idle().await;

    // Already cached: nothing to do
    assert_eq!(h.queue.enqueue(vec![a.clone()]).await.unwrap(), 0);
    assert!(h.queue.entries().is_empty());
    assert_eq!(h.remote.calls().len(), 1);
}

#[tokio::test]
async fn queue_survives_restart() {
    test_helpers::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("queue.db");
    let bus = NotificationBus::default();
    let cache = LocalCache::open(dir.path().join("cache"), 100 * MB, bus.clone())
        .await
        .unwrap();

    let remote = FakeRemote::new();
    let songs: Vec<_> = ["x", "y", "z"]
        .iter()
        .map(|id| {
            remote.hold(id);
            song(id, MB)
        })
        .collect();

    let store = Arc::new(SqliteQueueStore::open(&db).await.unwrap());
    let queue = DownloadQueue::open(cache.clone(), remote.clone(), store.clone(), bus.clone(), test_config())
        .await
        .unwrap();
    queue.enqueue(songs.clone()).await.unwrap();
    queue.shutdown().await;
    store.pool().close().await;

    let store = Arc::new(SqliteQueueStore::open(&db).await.unwrap());
    let restored = DownloadQueue::open(cache, FakeRemote::new(), store, bus, test_config())
        .await
        .unwrap();

    let expected: HashSet<SongId> = songs.iter().map(|s| s.id.clone()).collect();
    let actual: HashSet<SongId> = restored
        .entries()
        .iter()
        .map(|e| e.song_id().clone())
        .collect();
    assert_eq!(actual, expected);
    assert!(!restored.is_processing().await);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let h = Harness::new(100 * MB).await;
    let a = h.song("a", MB);
    h.remote.fail_with(
        "a",
        [
            RemoteError::Network("connection reset".into()),
            RemoteError::Server {
                status: 503,
                message: "busy".into(),
            },
        ],
    );

    h.queue.enqueue(vec![a.clone()]).await.unwrap();
    h.idle().await;

    assert!(h.cache.contains(&a.id));
    assert_eq!(h.remote.calls().len(), 3);
    assert!(h.queue.entries().is_empty());
}

#[tokio::test]
async fn exhausted_entry_is_parked_and_reported() {
    let h = Harness::new(100 * MB).await;
    let mut notifications = h.bus.subscribe();
    let a = h.song("a", MB);
    let b = h.song("b", MB);
    h.remote
        .fail_with("a", (0..5).map(|_| RemoteError::Network("timeout".into())));

    h.queue.enqueue(vec![a.clone(), b.clone()]).await.unwrap();
    h.idle().await;

    // A failure never blocks the rest of the queue
    assert!(h.cache.contains(&b.id));

    let parked = h.queue.parked();
    assert_eq!(parked.len(), 1);
    assert_eq!(parked[0].song_id(), &a.id);
    assert_eq!(parked[0].attempts, 3);
    assert!(parked[0].last_error.as_deref().unwrap().contains("timeout"));

    let mut seen = Vec::new();
    while let Ok(n) = notifications.try_recv() {
        seen.push(n);
    }
    assert!(seen.contains(&Notification::DownloadFailed {
        song_id: a.id.clone(),
        reason: RemoteError::Network("timeout".into()).to_string(),
    }));

    // Two failures left in the script, then success
    assert_eq!(h.queue.retry_failed().await.unwrap(), 1);
    h.idle().await;
    assert!(h.cache.contains(&a.id));
    assert!(h.queue.entries().is_empty());
}

#[tokio::test]
async fn missing_song_is_parked_without_retries() {
    let h = Harness::new(100 * MB).await;
    let a = h.song("a", MB);
    h.remote.fail_with("a", [RemoteError::NotFound("a".into())]);

    h.queue.enqueue(vec![a]).await.unwrap();
    h.idle().await;

    assert_eq!(h.remote.calls().len(), 1);
    assert_eq!(h.queue.parked().len(), 1);
}

#[tokio::test]
async fn auth_failure_stops_the_pass() {
    let h = Harness::new(100 * MB).await;
    let a = h.song("a", MB);
    let b = h.song("b", MB);
    h.remote.fail_with("a", [RemoteError::AuthRequired]);

    h.queue.enqueue(vec![a.clone(), b.clone()]).await.unwrap();
    h.idle().await;

    assert_eq!(h.remote.calls(), vec![a.id.clone()]);
    let entries = h.queue.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.attempts == 0));

    // After re-authentication the queue picks up again
    h.queue.start_processing().await;
    h.idle().await;
    assert!(h.cache.contains(&a.id));
    assert!(h.cache.contains(&b.id));
}

#[tokio::test]
async fn cancelling_in_flight_download_discards_it() {
    let h = Harness::new(100 * MB).await;
    let mut notifications = h.bus.subscribe();
    let _gate = h.remote.hold("a");
    let a = h.song("a", MB);

    h.queue.enqueue(vec![a.clone()]).await.unwrap();
    h.calls_reach(1).await;

    assert!(h.queue.cancel(&a.id).await.unwrap());
    assert!(!h.queue.cancel(&a.id).await.unwrap());
    h.idle().await;

    assert!(!h.cache.contains(&a.id));
    assert!(!h.cache.partial_path(&a).exists());
    assert!(h.queue.entries().is_empty());
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn cancel_all_empties_the_queue() {
    let h = Harness::new(100 * MB).await;
    let _gate = h.remote.hold("a");
    let songs: Vec<_> = ["a", "b", "c"].iter().map(|id| h.song(id, MB)).collect();

    h.queue.enqueue(songs).await.unwrap();
    h.calls_reach(1).await;

    assert_eq!(h.queue.cancel_all().await.unwrap(), 3);
    h.idle().await;

    assert!(h.queue.entries().is_empty());
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let config = DownloadQueueConfig {
        max_concurrent: 2,
        ..test_config()
    };
    let h = Harness::with(100 * MB, config, Arc::new(MemoryQueueStore::new())).await;
    h.remote.set_delay(Duration::from_millis(30));
    let songs: Vec<_> = (0..6).map(|i| h.song(&format!("s{i}"), MB)).collect();

    h.queue.enqueue(songs.clone()).await.unwrap();
    h.idle().await;

    assert_eq!(h.remote.peak_concurrency(), 2);
    assert!(songs.iter().all(|s| h.cache.contains(&s.id)));
}

#[tokio::test]
async fn concurrent_downloads_respect_quota() {
    let config = DownloadQueueConfig {
        max_concurrent: 3,
        ..test_config()
    };
    let h = Harness::with(10 * MB, config, Arc::new(MemoryQueueStore::new())).await;
    h.remote.set_delay(Duration::from_millis(20));
    let songs: Vec<_> = (0..8).map(|i| h.song(&format!("s{i}"), 3 * MB)).collect();

    h.queue.enqueue(songs).await.unwrap();
    h.idle().await;

    assert_eq!(h.cache.len(), 3);
    assert!(h.cache.current_size() <= 10 * MB);
    assert_eq!(h.queue.entries().len(), 5);
}

#[tokio::test]
async fn refused_entry_is_admitted_once_a_failed_download_frees_space() {
    let config = DownloadQueueConfig {
        max_concurrent: 2,
        ..test_config()
    };
    let h = Harness::with(100 * MB, config, Arc::new(MemoryQueueStore::new())).await;
    let a = h.song("a", 60 * MB);
    let b = h.song("b", 50 * MB);
    let gate = h.remote.hold("a");
    h.remote.fail_with("a", [RemoteError::NotFound("a".into())]);

    h.queue.enqueue(vec![a.clone(), b.clone()]).await.unwrap();
    h.calls_reach(1).await;
    // B does not fit next to A's reservation
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.remote.calls(), vec![a.id.clone()]);

    gate.notify_one();
    h.idle().await;

    assert!(h.cache.contains(&b.id));
    assert_eq!(h.cache.current_size(), 50 * MB);
    assert_eq!(h.remote.calls(), vec![a.id.clone(), b.id.clone()]);
    let parked = h.queue.parked();
    assert_eq!(parked.len(), 1);
    assert_eq!(parked[0].song_id(), &a.id);
}

#[tokio::test]
async fn transcoded_download_is_stored_in_the_delivered_container() {
    let config = DownloadQueueConfig {
        bitrate: Some(128),
        ..test_config()
    };
    let h = Harness::with(100 * MB, config, Arc::new(MemoryQueueStore::new())).await;
    let direct = h.song("direct", MB);
    let transcoded = h.song("transcoded", MB);
    h.remote.serve_container("direct", "mp3");
    h.remote.serve_container("transcoded", "aac");

    h.queue
        .enqueue(vec![direct.clone(), transcoded.clone()])
        .await
        .unwrap();
    h.idle().await;

    assert_eq!(h.cache.entry(&direct.id).unwrap().extension, "mp3");
    assert_eq!(h.cache.entry(&transcoded.id).unwrap().extension, "aac");
}

#[tokio::test]
async fn unlabelled_transcoded_download_is_stored_as_unknown() {
    let config = DownloadQueueConfig {
        bitrate: Some(128),
        ..test_config()
    };
    let h = Harness::with(100 * MB, config, Arc::new(MemoryQueueStore::new())).await;
    let a = h.song("a", MB);

    h.queue.enqueue(vec![a.clone()]).await.unwrap();
    h.idle().await;

    let entry = h.cache.entry(&a.id).unwrap();
    assert_eq!(entry.extension, "bin");
    assert!(entry.path.to_string_lossy().ends_with(".bin"));
}

#[tokio::test]
async fn original_download_keeps_the_song_container() {
    let h = Harness::new(100 * MB).await;
    let a = h.song("a", MB);

    h.queue.enqueue(vec![a.clone()]).await.unwrap();
    h.idle().await;

    assert_eq!(h.cache.entry(&a.id).unwrap().extension, "mp3");
}

#[tokio::test]
async fn album_downloads_in_track_order() {
    let h = Harness::new(100 * MB).await;
    let album = AlbumId::new("album-1");
    let tracks: Vec<_> = [(2, 1), (1, 2), (1, 1)]
        .iter()
        .map(|&(disc, index)| h.song(&format!("d{disc}t{index}"), MB).on_album("album-1", disc, index))
        .collect();
    let catalog = FakeCatalog {
        albums: HashMap::from([(album.clone(), tracks)]),
    };

    assert_eq!(h.queue.enqueue_album(&catalog, &album).await.unwrap(), 3);
    h.idle().await;

    let order: Vec<_> = h.remote.calls().iter().map(|id| id.to_string()).collect();
    assert_eq!(order, ["d1t1", "d1t2", "d2t1"]);
}

#[tokio::test]
async fn watchers_see_queue_changes() {
    let h = Harness::new(100 * MB).await;
    let mut rx = h.queue.subscribe();
    let gate = h.remote.hold("a");
    let a = h.song("a", MB);

    h.queue.enqueue(vec![a.clone()]).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().len(), 1);

    gate.notify_one();
    h.idle().await;
    assert!(rx.borrow_and_update().is_empty());
}
