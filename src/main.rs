use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use vod_chat_replay::catalog::{CatalogListing, CatalogStore, DirectoryCatalog, ManifestCatalog, StreamMatcher};
use vod_chat_replay::chat::{ChatLoader, LoadOptions};
use vod_chat_replay::clip::{ClipExtractor, ClipLocator, ClipRequest};
use vod_chat_replay::config::Config;
use vod_chat_replay::encoder::FfmpegEncoder;
use vod_chat_replay::session::ReplaySession;
use vod_chat_replay::video::FfprobeProbe;

#[derive(Parser)]
#[command(name = "vod-chat-replay")]
#[command(version, about = "Replay recorded livestream chat in sync with the video and cut clips")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the well-known locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print chat messages around a playback time
    At {
        /// Chat export
        #[arg(long)]
        chat: PathBuf,
        /// Playback time in seconds
        #[arg(long)]
        time: f64,
        /// Tolerance either side of the time (seconds)
        #[arg(long)]
        window: Option<f64>,
    },
    /// Print chat messages within a playback interval
    Range {
        #[arg(long)]
        chat: PathBuf,
        #[arg(long)]
        from: f64,
        #[arg(long)]
        to: f64,
    },
    /// Cut a clip and its chat slice
    Clip {
        /// Source recording
        #[arg(long)]
        video: PathBuf,
        /// Chat export; resolved through the catalog when omitted
        #[arg(long)]
        chat: Option<PathBuf>,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
        /// Clip title used for the artifact names
        #[arg(long)]
        title: Option<String>,
        /// Known duration of the recording in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Find the chat export bound to a recording
    Match {
        video: PathBuf,
    },
    /// List catalogued streams
    Streams,
    /// List clips saved for a recording
    Clips {
        video: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config so config problems are reported;
    // the configured level is applied once the config is known.
    let (filter, filter_handle) = reload::Layer::new(log_filter(cli.verbose, "info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    filter_handle
        .reload(log_filter(cli.verbose, &config.logging.level))
        .context("applying configured log level")?;

    config.validate()?;
    info!("{}", config.summary());

    let loader = ChatLoader::new(LoadOptions {
        timestamp_unit: config.chat.timestamp_unit,
        stream_start: None,
    });
    let extractor = ClipExtractor::new(
        Arc::new(FfmpegEncoder::new(&config.clips)),
        ClipLocator::new(&config.clips),
    );
    let session = ReplaySession::new(loader, extractor, config.clips.max_concurrent);

    match cli.command {
        Commands::At { chat, time, window } => {
            let summary = session.load_chat(&chat).await?;
            let window = window.unwrap_or(config.chat.default_window_secs);
            let messages = session.messages_at(time, window)?;
            info!("{} of {} messages within {}s of {}s", messages.len(), summary.loaded, window, time);
            print_json(&messages)?;
        }
        Commands::Range { chat, from, to } => {
            session.load_chat(&chat).await?;
            print_json(&session.messages_between(from, to)?)?;
        }
        Commands::Clip {
            video,
            chat,
            start,
            end,
            title,
            duration,
        } => {
            let mut request = ClipRequest::new(video.clone(), start, end);
            match chat {
                Some(chat) => {
                    session.load_chat(&chat).await?;
                }
                None => {
                    let matcher = StreamMatcher::from_listing(&catalog_listing(&config).await?);
                    if session.open_stream(&matcher, &video).await?.is_none() {
                        warn!("No chat export bound to {}, clip will have an empty chat slice", video.display());
                    }
                    if let Some(matched) = session.current_stream() {
                        request.source_duration = matched.stream.duration;
                    }
                }
            }
            if let Some(duration) = duration {
                request = request.with_duration(duration);
            }
            if let Some(title) = title {
                request = request.with_title(title);
            }

            let result = session.create_clip(request).await?;
            print_json(&result)?;
            if !result.success {
                return Err(anyhow!(
                    "clip failed: {}",
                    result.error_message.unwrap_or_else(|| "unknown error".to_string())
                ));
            }
        }
        Commands::Match { video } => {
            let matcher = StreamMatcher::from_listing(&catalog_listing(&config).await?);
            print_json(&matcher.resolve(&video).await?)?;
        }
        Commands::Streams => {
            print_json(&catalog_listing(&config).await?)?;
        }
        Commands::Clips { video } => {
            print_json(&session.extractor().list_clips(&video).await?)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` when set, otherwise this crate at `level` and everything else at warn
fn log_filter(verbose: bool, level: &str) -> EnvFilter {
    let level = if verbose { "debug" } else { level };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vod_chat_replay={},warn", level)))
}

/// Listing from the configured manifest, or from scanning the configured directory
async fn catalog_listing(config: &Config) -> Result<CatalogListing> {
    let listing = if let Some(manifest) = &config.catalog.manifest_path {
        ManifestCatalog::new(manifest.clone()).list().await?
    } else if let Some(scan_dir) = &config.catalog.scan_dir {
        DirectoryCatalog::new(scan_dir.clone(), Arc::new(FfprobeProbe::new()))
            .with_cache_dir(config.catalog.cache_dir.clone())
            .list()
            .await?
    } else {
        return Err(anyhow!("no catalog configured: set catalog.manifest_path or catalog.scan_dir"));
    };

    for error in &listing.errors {
        warn!("Catalog: {}", error);
    }
    Ok(listing)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", output);
    Ok(())
}
