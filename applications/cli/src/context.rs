//! Wiring of the cache, the queue and the server client

use anyhow::Context as _;
use aria_core::{AriaConfig, NotificationBus};
use aria_offline::{DownloadQueue, DownloadQueueConfig, LocalCache, SqliteQueueStore};
use aria_server_client::{MediaServerClient, ServerConfig};
use std::sync::Arc;

pub struct Context {
    pub bus: NotificationBus,
    pub client: Arc<MediaServerClient>,
    pub queue: DownloadQueue,
}

impl Context {
    pub async fn open(config: &AriaConfig) -> anyhow::Result<Self> {
        let client = Arc::new(server_client(config)?);
        if !client.is_authenticated().await {
            anyhow::bail!("Not logged in, run `aria login` first");
        }

        let bus = NotificationBus::default();
        let cache = LocalCache::open(&config.cache.directory, config.cache.quota_bytes, bus.clone())
            .await
            .context("Failed to open the local cache")?;

        if let Some(parent) = config.cache.database_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let store = SqliteQueueStore::open(&config.cache.database_path)
            .await
            .context("Failed to open the queue database")?;

        let queue = DownloadQueue::open(
            cache,
            client.clone(),
            Arc::new(store),
            bus.clone(),
            DownloadQueueConfig::from_settings(&config.downloads),
        )
        .await?;

        Ok(Self {
            bus,
            client,
            queue,
        })
    }
}

pub fn server_client(config: &AriaConfig) -> anyhow::Result<MediaServerClient> {
    if config.server.url.is_empty() {
        anyhow::bail!("server.url is not configured");
    }
    let client =
        MediaServerClient::new(ServerConfig::from_settings(&config.server, &config.streaming))?;
    Ok(client)
}

/// Open the cache without touching the server
pub async fn open_cache(config: &AriaConfig) -> anyhow::Result<LocalCache> {
    LocalCache::open(
        &config.cache.directory,
        config.cache.quota_bytes,
        NotificationBus::default(),
    )
    .await
    .context("Failed to open the local cache")
}
