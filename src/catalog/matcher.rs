//! Resolves a video to its chat export through the content hash
use super::{CatalogListing, FileType, Stream};
use crate::error::{ReplayError, Result};
use crate::video::content_hash;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of resolving a video
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMatch {
    pub stream: Stream,

    /// Chat export bound to the stream's hash, if any
    pub chat_path: Option<PathBuf>,
}

/// Exact-hash lookup from videos to chat exports
#[derive(Debug, Clone, Default)]
pub struct StreamMatcher {
    streams: HashMap<PathBuf, Stream>,
    bindings: HashMap<String, PathBuf>,
}

impl StreamMatcher {
    /// Build a matcher from a catalog listing
    pub fn from_listing(listing: &CatalogListing) -> Self {
        let streams = listing
            .streams
            .iter()
            .map(|stream| (stream.path.clone(), stream.clone()))
            .collect();

        let mut bindings: HashMap<String, PathBuf> = HashMap::new();
        for binding in &listing.chat_bindings {
            if let Some(existing) = bindings.get(&binding.hash) {
                if existing != &binding.chat_path {
                    warn!(
                        "Hash {} bound to both {} and {}, keeping the first",
                        binding.hash,
                        existing.display(),
                        binding.chat_path.display()
                    );
                }
                continue;
            }
            bindings.insert(binding.hash.clone(), binding.chat_path.clone());
        }

        Self { streams, bindings }
    }

    /// Chat export bound to `hash`
    pub fn chat_for_hash(&self, hash: &str) -> Option<&Path> {
        self.bindings.get(hash).map(PathBuf::as_path)
    }

    /// Resolve a video to its catalog stream and matching chat export.
    ///
    /// The hash comes from the catalog when the path is known there and is
    /// computed from the file contents otherwise. A video without a bound
    /// chat export resolves with `chat_path: None`.
    pub async fn resolve(&self, video_path: &Path) -> Result<StreamMatch> {
        if !video_path.exists() {
            return Err(ReplayError::NotFound(video_path.to_path_buf()));
        }

        let stream = match self.streams.get(video_path) {
            Some(stream) => {
                debug!("📋 {} known to catalog", video_path.display());
                stream.clone()
            }
            None => {
                let hash = content_hash(video_path).await?;
                Stream::new(hash, video_path.to_path_buf(), FileType::Livestream)
            }
        };

        let chat_path = self.chat_for_hash(&stream.hash).map(Path::to_path_buf);
        match &chat_path {
            Some(chat) => info!("🔗 {} matched chat {}", video_path.display(), chat.display()),
            None => info!("{} has no recorded chat", video_path.display()),
        }

        Ok(StreamMatch { stream, chat_path })
    }
}
