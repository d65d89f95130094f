//! Catalog built by scanning a directory of recordings
use super::cache::{CachedVideo, VideoMetadataCache};
use super::{sidecar_path, CatalogListing, CatalogStore, ChatBinding, FileType, Stream};
use crate::error::{ReplayError, Result};
use crate::video::{content_hash, is_video_file, MediaProbe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const CACHE_KIND: &str = "streams";

/// Scans `root` for recordings, hashing each one and binding any
/// `<stem>_chat.json` export found beside it to that hash.
#[derive(Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    cache_dir: Option<PathBuf>,
    probe: Arc<dyn MediaProbe>,
    max_depth: usize,
    concurrency: usize,
}

impl DirectoryCatalog {
    pub fn new(root: PathBuf, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            root,
            cache_dir: None,
            probe,
            max_depth: 4,
            concurrency: 4,
        }
    }

    /// Persist hashes and durations in a metadata cache
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Hash the contents and probe the duration of one video
    async fn inspect(&self, video: &Path) -> Result<VideoFacts> {
        let hash = content_hash(video).await?;
        let duration = match self.probe.duration(video).await {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!("Could not probe duration of {}: {}", video.display(), e);
                None
            }
        };

        let metadata = tokio::fs::metadata(video).await?;
        Ok(VideoFacts {
            hash,
            duration,
            last_modified: metadata.modified()?.into(),
            file_size: metadata.len(),
        })
    }

    /// Hash and duration for every video, from cache when still valid.
    /// Videos missing from the cache are inspected concurrently.
    async fn describe_all(
        &self,
        videos: Vec<PathBuf>,
        cache: &mut Option<VideoMetadataCache>,
    ) -> Vec<(PathBuf, Result<(String, Option<f64>)>)> {
        let mut described = Vec::with_capacity(videos.len());
        let mut pending = Vec::new();

        for video in videos {
            let cached = match cache.as_ref() {
                Some(cache) => cache.fresh_entry(&video).await.map(|e| (e.hash.clone(), e.duration)),
                None => None,
            };
            match cached {
                Some((hash, duration)) => {
                    debug!("📋 Using cached metadata for {}", video.display());
                    described.push((video, Ok((hash, Some(duration)))));
                }
                None => pending.push(video),
            }
        }

        let inspected: Vec<(PathBuf, Result<VideoFacts>)> = stream::iter(pending)
            .map(|video| async move {
                let facts = self.inspect(&video).await;
                (video, facts)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (video, facts) in inspected {
            let facts = facts.map(|facts| {
                if let Some(cache) = cache.as_mut() {
                    cache.insert(CachedVideo {
                        path: video.clone(),
                        hash: facts.hash.clone(),
                        duration: facts.duration.unwrap_or(0.0),
                        last_modified: facts.last_modified,
                        file_size: facts.file_size,
                    });
                }
                (facts.hash, facts.duration)
            });
            described.push((video, facts));
        }

        described.sort_by(|a, b| a.0.cmp(&b.0));
        described
    }
}

/// Video files under `root`, sorted, plus any walk errors
fn discover_videos(root: &Path, max_depth: usize) -> (Vec<PathBuf>, Vec<String>) {
    let mut videos = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(max_depth) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_video_file(entry.path()) => {
                videos.push(entry.path().to_path_buf())
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("scan error: {}", e)),
        }
    }

    videos.sort();
    (videos, errors)
}

struct VideoFacts {
    hash: String,
    duration: Option<f64>,
    last_modified: DateTime<Utc>,
    file_size: u64,
}

#[async_trait]
impl CatalogStore for DirectoryCatalog {
    async fn list(&self) -> Result<CatalogListing> {
        if !self.root.is_dir() {
            return Err(ReplayError::NotFound(self.root.clone()));
        }

        let mut cache = match &self.cache_dir {
            Some(dir) => Some(VideoMetadataCache::load(dir, CACHE_KIND).await?),
            None => None,
        };

        let root = self.root.clone();
        let max_depth = self.max_depth;
        let (videos, errors) = tokio::task::spawn_blocking(move || discover_videos(&root, max_depth))
            .await
            .map_err(|e| ReplayError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let mut listing = CatalogListing {
            errors,
            ..CatalogListing::default()
        };

        for (video, described) in self.describe_all(videos, &mut cache).await {
            let (hash, duration) = match described {
                Ok(described) => described,
                Err(e) => {
                    listing.errors.push(format!("{}: {}", video.display(), e));
                    continue;
                }
            };

            let chat_path = sidecar_path(&video, "_chat.json");
            if chat_path.is_file() {
                listing.chat_bindings.push(ChatBinding {
                    hash: hash.clone(),
                    chat_path,
                });
            }

            let mut stream = Stream::new(hash, video.clone(), FileType::Livestream).with_duration(duration);
            let contact_sheet = sidecar_path(&video, "_contact_sheet.jpg");
            if contact_sheet.is_file() {
                stream.contact_sheet = Some(contact_sheet);
            }
            listing.streams.push(stream);
        }

        if let Some(cache) = cache.as_mut() {
            if let Err(e) = cache.save().await {
                warn!("Failed to save video cache: {}", e);
            }
        }

        info!(
            "🔍 Scanned {}: {} streams, {} with chat",
            self.root.display(),
            listing.streams.len(),
            listing.chat_bindings.len()
        );

        Ok(listing)
    }
}
