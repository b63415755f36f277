//! Aria Offline
//!
//! Local audio cache and the download queue feeding it.
//!
//! # Components
//!
//! - [`LocalCache`]: size-bounded directory of downloaded songs with quota
//!   admission, atomic commits and lease-protected removal
//! - [`DownloadQueue`]: durable, deduplicated queue drained by a
//!   bounded-concurrency worker with retry and back-off
//! - [`QueueStore`]: persistence seam, backed by SQLite or memory
//!
//! # Example
//!
//! ```rust,no_run
//! use aria_core::{AriaConfig, NotificationBus};
//! use aria_offline::{DownloadQueue, DownloadQueueConfig, LocalCache, SqliteQueueStore};
//! use std::sync::Arc;
//!
//! # async fn example(remote: Arc<dyn aria_core::RemoteMediaService>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AriaConfig::load(None)?;
//! let bus = NotificationBus::default();
//!
//! let cache = LocalCache::open(&config.cache.directory, config.cache.quota_bytes, bus.clone()).await?;
//! let store = Arc::new(SqliteQueueStore::open(&config.cache.database_path).await?);
//! let queue = DownloadQueue::open(
//!     cache,
//!     remote,
//!     store,
//!     bus,
//!     DownloadQueueConfig::from_settings(&config.downloads),
//! )
//! .await?;
//!
//! queue.start_processing().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod cache;
pub mod entry;
pub mod error;
pub mod queue;
pub mod retry;
pub mod store;

pub use cache::{CacheEntry, CacheLease, LocalCache, Reservation};
pub use entry::{sort_for_download, DownloadEntry};
pub use error::{CacheError, DownloadError, Result, StoreError};
pub use queue::{DownloadQueue, DownloadQueueConfig};
pub use retry::RetryPolicy;
pub use store::{MemoryQueueStore, QueueStore, SqliteQueueStore};
