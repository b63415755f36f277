/// Aria - offline downloads and cache management for a self-hosted media server
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "aria")]
#[command(about = "Manage offline downloads and the local audio cache", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ARIA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the session for the configuration
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "ARIA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Queue songs for offline playback
    Download {
        #[command(subcommand)]
        target: DownloadTarget,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Inspect or edit the download queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Inspect or clear the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum DownloadTarget {
    /// Every song of an album
    Album { album_id: String },
    /// Individual songs
    Songs {
        #[arg(required = true)]
        song_ids: Vec<String>,
    },
}

#[derive(Args)]
struct WaitArgs {
    /// Return after queueing instead of draining the queue
    #[arg(long, global = true)]
    no_wait: bool,
}

#[derive(Subcommand)]
enum QueueAction {
    /// List pending downloads
    List,
    /// Cancel one download, or all of them
    Cancel {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        song_id: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Give parked downloads a fresh set of attempts
    Retry {
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache usage
    Status,
    /// List cached songs
    List,
    /// Delete one cached song
    Remove { song_id: String },
    /// Delete every cached song
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aria=info,aria_offline=info,aria_server_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = aria_core::AriaConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::login(&config, &username, &password).await?;
        }
        Commands::Download { target, wait } => {
            let ctx = context::Context::open(&config).await?;
            match target {
                DownloadTarget::Album { album_id } => {
                    commands::download_album(&ctx, &album_id).await?;
                }
                DownloadTarget::Songs { song_ids } => {
                    commands::download_songs(&ctx, &song_ids).await?;
                }
            }
            commands::finish(&ctx, !wait.no_wait).await?;
        }
        Commands::Queue { action } => {
            let ctx = context::Context::open(&config).await?;
            let wait = match action {
                QueueAction::List => {
                    commands::list_queue(&ctx);
                    false
                }
                QueueAction::Cancel { song_id, all } => {
                    commands::cancel(&ctx, song_id.as_deref(), all).await?;
                    false
                }
                QueueAction::Retry { wait } => {
                    commands::retry(&ctx).await?;
                    !wait.no_wait
                }
            };
            commands::finish(&ctx, wait).await?;
        }
        Commands::Cache { action } => {
            let cache = context::open_cache(&config).await?;
            match action {
                CacheAction::Status => commands::cache_status(&cache),
                CacheAction::List => commands::list_cache(&cache),
                CacheAction::Remove { song_id } => {
                    cache.remove(&aria_core::SongId::new(song_id)).await?;
                }
                CacheAction::Clear => cache.remove_all().await?,
            }
        }
    }

    Ok(())
}
