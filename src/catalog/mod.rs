//! Catalog of recorded streams and their chat exports, bound by content hash

pub mod cache;
pub mod directory;
pub mod manifest;
pub mod matcher;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use cache::{CachedVideo, VideoMetadataCache};
pub use directory::DirectoryCatalog;
pub use manifest::ManifestCatalog;
pub use matcher::{StreamMatch, StreamMatcher};

/// Kind of file a catalog entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Livestream,
    ContactSheet,
    Clip,
    #[serde(other)]
    Unknown,
}

/// A recorded video known to the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    /// Content hash binding the video to its chat export
    pub hash: String,

    pub path: PathBuf,

    #[serde(rename = "file_type")]
    pub file_type: FileType,

    /// Creator the stream belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Thumbnail grid image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_sheet: Option<PathBuf>,

    /// Total playback length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Stream {
    pub fn new(hash: impl Into<String>, path: PathBuf, file_type: FileType) -> Self {
        Self {
            hash: hash.into(),
            path,
            file_type,
            model: None,
            contact_sheet: None,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }
}

/// Association between a content hash and a chat export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatBinding {
    pub hash: String,
    pub chat_path: PathBuf,
}

/// Everything a catalog store knows, plus entries it could not load
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogListing {
    pub streams: Vec<Stream>,
    pub chat_bindings: Vec<ChatBinding>,
    pub errors: Vec<String>,
}

impl CatalogListing {
    /// Find the stream recorded for a path
    pub fn stream_for_path(&self, path: &Path) -> Option<&Stream> {
        self.streams.iter().find(|stream| stream.path == path)
    }

    /// Livestream recordings only
    pub fn livestreams(&self) -> impl Iterator<Item = &Stream> {
        self.streams
            .iter()
            .filter(|stream| stream.file_type == FileType::Livestream)
    }
}

/// Read-only source of streams and chat bindings
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// List known streams and bindings; broken entries go to `errors`
    async fn list(&self) -> Result<CatalogListing>;
}

/// Conventional sidecar path next to a recording, e.g. `<stem>_chat.json`
pub(crate) fn sidecar_path(video_path: &Path, suffix: &str) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    video_path.with_file_name(format!("{}{}", stem, suffix))
}
