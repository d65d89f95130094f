//! Replay session: the currently loaded chat index and stream binding
//!
//! The index and the stream it belongs to live together in one
//! [`ReplaySnapshot`]. Readers take an `Arc` of the current snapshot and
//! query it without holding any lock; loading a new export swaps the whole
//! snapshot in one assignment, so in-flight queries keep using the index
//! they started with and never see an index paired with another stream.

use crate::catalog::{StreamMatch, StreamMatcher};
use crate::chat::{ChatLoader, ChatMessage, ChatTimeIndex, ScrubWindow};
use crate::clip::{ClipExtractor, ClipRequest, ClipResult};
use crate::error::{ReplayError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::info;

/// Summary of a chat load
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// A chat index together with the stream it was opened for
#[derive(Debug, Default)]
pub struct ReplaySnapshot {
    pub index: Arc<ChatTimeIndex>,

    /// `None` when the chat was loaded directly rather than through the catalog
    pub stream: Option<StreamMatch>,
}

/// Orchestrates loading, scrubbing and clipping for one viewer
pub struct ReplaySession {
    loader: ChatLoader,
    extractor: ClipExtractor,
    current: RwLock<Arc<ReplaySnapshot>>,
    clip_permits: Arc<Semaphore>,
}

impl ReplaySession {
    pub fn new(loader: ChatLoader, extractor: ClipExtractor, max_concurrent_clips: usize) -> Self {
        Self {
            loader,
            extractor,
            current: RwLock::new(Arc::new(ReplaySnapshot::default())),
            clip_permits: Arc::new(Semaphore::new(max_concurrent_clips.max(1))),
        }
    }

    /// Current index and stream binding, taken together
    pub fn snapshot(&self) -> Arc<ReplaySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Snapshot of the current index
    pub fn chat_index(&self) -> Arc<ChatTimeIndex> {
        Arc::clone(&self.snapshot().index)
    }

    /// Replace the current index and stream binding wholesale
    pub fn install(&self, index: ChatTimeIndex, stream: Option<StreamMatch>) {
        *self.current.write() = Arc::new(ReplaySnapshot {
            index: Arc::new(index),
            stream,
        });
    }

    async fn build_index(&self, path: &Path) -> Result<(ChatTimeIndex, LoadSummary)> {
        let loaded = self.loader.load_file(path).await?;
        let summary = LoadSummary {
            loaded: loaded.messages.len(),
            skipped: loaded.skipped,
        };

        let index = tokio::task::spawn_blocking(move || ChatTimeIndex::build(loaded.messages))
            .await
            .map_err(|e| ReplayError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        info!("💬 Chat ready: {} messages ({} skipped)", summary.loaded, summary.skipped);
        Ok((index, summary))
    }

    /// Load a chat export and make it current, unbound from any stream
    pub async fn load_chat(&self, path: &Path) -> Result<LoadSummary> {
        let (index, summary) = self.build_index(path).await?;
        self.install(index, None);
        Ok(summary)
    }

    /// Resolve a video through the catalog, loading its chat export if bound.
    ///
    /// A video without chat becomes current with an empty index.
    pub async fn open_stream(&self, matcher: &StreamMatcher, video_path: &Path) -> Result<Option<LoadSummary>> {
        let matched = matcher.resolve(video_path).await?;

        let (index, summary) = match &matched.chat_path {
            Some(chat_path) => {
                let (index, summary) = self.build_index(chat_path).await?;
                (index, Some(summary))
            }
            None => (ChatTimeIndex::default(), None),
        };

        self.install(index, Some(matched));
        Ok(summary)
    }

    /// Currently opened stream and its chat binding
    pub fn current_stream(&self) -> Option<StreamMatch> {
        self.snapshot().stream.clone()
    }

    /// Messages within `window` seconds of `t`
    pub fn messages_at(&self, t: f64, window: f64) -> Result<Vec<ChatMessage>> {
        let index = self.chat_index();
        Ok(index.query_at(t, window)?.to_vec())
    }

    /// Messages in an explicit scrub window around `t`
    pub fn messages_in_window(&self, t: f64, window: ScrubWindow) -> Result<Vec<ChatMessage>> {
        let index = self.chat_index();
        Ok(index.query_window(t, window)?.to_vec())
    }

    /// Messages in `[t0, t1]`
    pub fn messages_between(&self, t0: f64, t1: f64) -> Result<Vec<ChatMessage>> {
        let index = self.chat_index();
        Ok(index.query_range(t0, t1)?.to_vec())
    }

    /// Every message of the current export in index order
    pub fn all_messages(&self) -> Vec<ChatMessage> {
        self.chat_index().messages().to_vec()
    }

    /// Run a clip extraction off the caller's task.
    ///
    /// The extraction works on the index snapshot current at spawn time and
    /// waits for one of the session's clip permits.
    pub fn spawn_clip(&self, request: ClipRequest) -> JoinHandle<Result<ClipResult>> {
        let index = self.chat_index();
        let extractor = self.extractor.clone();
        let permits = Arc::clone(&self.clip_permits);

        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ReplayError::Encoding(format!("clip queue closed: {}", e)))?;
            extractor.extract(&index, &request).await
        })
    }

    /// Extract a clip and wait for it
    pub async fn create_clip(&self, request: ClipRequest) -> Result<ClipResult> {
        self.spawn_clip(request)
            .await
            .map_err(|e| ReplayError::Encoding(format!("clip task failed: {}", e)))?
    }

    pub fn extractor(&self) -> &ClipExtractor {
        &self.extractor
    }

    /// Number of clip extractions that could start right now
    pub fn available_clip_slots(&self) -> usize {
        self.clip_permits.available_permits()
    }
}
