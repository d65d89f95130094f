//! Video metadata cache persisted as JSON, keyed by video path
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cached facts about one video file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVideo {
    pub path: PathBuf,
    pub hash: String,
    pub duration: f64,
    pub last_modified: DateTime<Utc>,
    pub file_size: u64,
}

/// On-disk document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheDocument {
    videos: HashMap<String, CachedVideo>,
    last_updated: Option<DateTime<Utc>>,
}

/// Manages `<cache_dir>/<kind>_cache.json`
#[derive(Debug, Clone)]
pub struct VideoMetadataCache {
    cache_path: PathBuf,
    document: CacheDocument,
}

impl VideoMetadataCache {
    /// Load the cache for `kind`; a missing or corrupt file yields an empty cache
    pub async fn load(cache_dir: &Path, kind: &str) -> Result<Self> {
        let cache_path = cache_dir.join(format!("{}_cache.json", kind));

        let document = match tokio::fs::read_to_string(&cache_path).await {
            Ok(content) => match serde_json::from_str::<CacheDocument>(&content) {
                Ok(document) => {
                    debug!("📚 Loaded {} cached videos from {}", document.videos.len(), cache_path.display());
                    document
                }
                Err(e) => {
                    warn!("Ignoring corrupt cache {}: {}", cache_path.display(), e);
                    CacheDocument::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheDocument::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { cache_path, document })
    }

    /// Return the cached entry if the file on disk still matches it
    pub async fn fresh_entry(&self, video_path: &Path) -> Option<&CachedVideo> {
        let cached = self.get(video_path)?;
        let metadata = tokio::fs::metadata(video_path).await.ok()?;
        let modified: DateTime<Utc> = metadata.modified().ok()?.into();

        let unchanged = cached.last_modified == modified && cached.file_size == metadata.len();
        if unchanged && cached.duration > 0.0 {
            Some(cached)
        } else {
            debug!("🔄 Cache entry stale for {}", video_path.display());
            None
        }
    }

    /// Record facts about a video
    pub fn insert(&mut self, entry: CachedVideo) {
        self.document
            .videos
            .insert(entry.path.to_string_lossy().to_string(), entry);
    }

    pub fn get(&self, video_path: &Path) -> Option<&CachedVideo> {
        self.document.videos.get(video_path.to_string_lossy().as_ref())
    }

    pub fn len(&self) -> usize {
        self.document.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.videos.is_empty()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.document.last_updated
    }

    /// Write the cache back to disk
    pub async fn save(&mut self) -> Result<()> {
        self.document.last_updated = Some(Utc::now());

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json_content = serde_json::to_string_pretty(&self.document)?;
        tokio::fs::write(&self.cache_path, json_content).await?;
        info!("💾 Saved {} cached videos to {}", self.document.videos.len(), self.cache_path.display());
        Ok(())
    }
}
