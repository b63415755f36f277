//! Subcommand implementations

use crate::context::{server_client, Context};
use aria_core::{AlbumId, AriaConfig, CatalogRepository, Notification, SongId};
use aria_offline::LocalCache;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub async fn login(config: &AriaConfig, username: &str, password: &str) -> anyhow::Result<()> {
    let client = server_client(config)?;
    let login = client.login(username, password).await?;

    println!("Logged in as {}", login.user.name);
    println!("ARIA__SERVER__ACCESS_TOKEN={}", login.access_token);
    println!("ARIA__SERVER__USER_ID={}", login.user.id);
    Ok(())
}

pub async fn download_album(ctx: &Context, album_id: &str) -> anyhow::Result<()> {
    let album_id = AlbumId::new(album_id);
    let added = ctx
        .queue
        .enqueue_album(ctx.client.as_ref(), &album_id)
        .await?;

    println!("Queued {added} songs from album {album_id}");
    Ok(())
}

pub async fn download_songs(ctx: &Context, song_ids: &[String]) -> anyhow::Result<()> {
    let mut songs = Vec::with_capacity(song_ids.len());
    for id in song_ids {
        let id = SongId::new(id.as_str());
        match ctx.client.song(&id).await? {
            Some(song) => songs.push(song),
            None => warn!(song_id = %id, "Unknown song, skipping"),
        }
    }

    let added = ctx.queue.enqueue(songs).await?;
    println!("Queued {added} songs");
    Ok(())
}

pub fn list_queue(ctx: &Context) {
    let parked = ctx.queue.parked();
    let entries = ctx.queue.entries();

    if entries.is_empty() {
        println!("Download queue is empty");
        return;
    }

    for entry in &entries {
        let state = if parked.iter().any(|p| p.song_id() == entry.song_id()) {
            "parked"
        } else {
            "pending"
        };
        println!(
            "{:<8} {:<24} {} (attempts: {})",
            state,
            entry.song_id(),
            entry.song.title,
            entry.attempts
        );
        if let Some(error) = &entry.last_error {
            println!("         last error: {error}");
        }
    }
}

pub async fn cancel(ctx: &Context, song_id: Option<&str>, all: bool) -> anyhow::Result<()> {
    if all {
        let count = ctx.queue.cancel_all().await?;
        println!("Cancelled {count} downloads");
        return Ok(());
    }

    if let Some(id) = song_id {
        if ctx.queue.cancel(&SongId::new(id)).await? {
            println!("Cancelled {id}");
        } else {
            println!("{id} is not queued");
        }
    }
    Ok(())
}

pub async fn retry(ctx: &Context) -> anyhow::Result<()> {
    let count = ctx.queue.retry_failed().await?;
    println!("Retrying {count} downloads");
    Ok(())
}

/// Drain the queue when `wait` is set, then stop the worker
///
/// Ctrl-C stops early; unfinished entries stay persisted.
pub async fn finish(ctx: &Context, wait: bool) -> anyhow::Result<()> {
    if wait {
        drain(ctx).await;
    }
    ctx.queue.shutdown().await;
    Ok(())
}

async fn drain(ctx: &Context) {
    let mut updates = ctx.queue.subscribe();
    let mut notifications = ctx.bus.subscribe();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    ctx.queue.start_processing().await;

    loop {
        let pending = ctx.queue.entries().len();
        if pending == ctx.queue.parked().len() {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            notification = notifications.recv() => match notification {
                Ok(Notification::SongDownloaded(id)) => println!("Downloaded {id}"),
                Ok(Notification::DownloadFailed { song_id, reason }) => {
                    println!("Gave up on {song_id}: {reason}");
                }
                Ok(Notification::SongFileDeleted(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = &mut interrupt => {
                info!("Interrupted, pending downloads resume on the next run");
                break;
            }
        }
    }

    let parked = ctx.queue.parked().len();
    if parked > 0 {
        println!("{parked} downloads failed, run `aria queue retry` to try again");
    }
}

pub fn cache_status(cache: &LocalCache) {
    println!("Songs:     {}", cache.len());
    println!("Used:      {}", format_bytes(cache.current_size()));
    println!("Quota:     {}", format_bytes(cache.quota()));
    println!("Available: {}", format_bytes(cache.available()));
}

pub fn list_cache(cache: &LocalCache) {
    let mut entries = cache.entries();
    entries.sort_by(|a, b| a.song_id.as_str().cmp(b.song_id.as_str()));

    for entry in entries {
        println!(
            "{:<24} {:>10} {}",
            entry.song_id,
            format_bytes(entry.size_bytes),
            entry.path.display()
        );
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
