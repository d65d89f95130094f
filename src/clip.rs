//! Clip extraction: a trimmed video plus the chat slice covering the same window

use crate::catalog::Stream;
use crate::chat::{write_chat_slice, ChatTimeIndex};
use crate::config::{ClipConfig, ClipStorage};
use crate::encoder::VideoEncoder;
use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const CLIP_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];
const MAX_FILENAME_BYTES: usize = 255;

/// A request to cut `[start, end]` seconds out of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub source: PathBuf,
    pub start: f64,
    pub end: f64,

    /// Known duration of the source, used to clamp `end`
    pub source_duration: Option<f64>,

    /// Base name for the artifacts
    pub title: Option<String>,
}

impl ClipRequest {
    pub fn new(source: PathBuf, start: f64, end: f64) -> Self {
        Self {
            source,
            start,
            end,
            source_duration: None,
            title: None,
        }
    }

    /// Request a clip of a catalogued stream, carrying its known duration
    pub fn for_stream(stream: &Stream, start: f64, end: f64) -> Self {
        Self {
            source_duration: stream.duration,
            ..Self::new(stream.path.clone(), start, end)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.source_duration = Some(duration);
        self
    }
}

/// Which artifact failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipErrorKind {
    /// The video cut failed; no artifacts were produced
    Encoding,
    /// The video was cut but the chat slice could not be written
    Serialization,
}

/// Outcome of one clip extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipResult {
    pub success: bool,

    /// Trimmed video, present whenever the encoder succeeded
    pub video_path: Option<PathBuf>,

    /// Chat slice location, present once the video was cut. With a
    /// `Serialization` error this is where the write was attempted.
    pub chat_path: Option<PathBuf>,

    /// Interval actually cut, after clamping
    pub start: f64,
    pub end: f64,

    /// Whether `end` was clamped to the source duration
    pub clamped: bool,

    pub chat_message_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ClipErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Resolves where clip artifacts are written
#[derive(Debug, Clone)]
pub struct ClipLocator {
    storage: ClipStorage,
    custom_dir: Option<PathBuf>,
    app_data_dir: PathBuf,
}

impl ClipLocator {
    pub fn new(config: &ClipConfig) -> Self {
        Self {
            storage: config.storage,
            custom_dir: config.custom_dir.clone(),
            app_data_dir: config.app_data_dir.clone(),
        }
    }

    /// Output directory for clips of `source`
    pub fn output_dir(&self, source: &Path) -> PathBuf {
        match self.storage {
            ClipStorage::VideosDir => user_videos_dir()
                .map(|dir| dir.join("vod-clips"))
                .unwrap_or_else(|| self.app_data_dir.join("clips")),
            ClipStorage::SourceVideoDir => source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("clips"),
            ClipStorage::CustomDir => self
                .custom_dir
                .clone()
                .unwrap_or_else(|| self.app_data_dir.join("clips")),
        }
    }
}

/// Videos directory, falling back to Documents and then home
fn user_videos_dir() -> Option<PathBuf> {
    let dirs = directories::UserDirs::new()?;
    dirs.video_dir()
        .or_else(|| dirs.document_dir())
        .map(Path::to_path_buf)
        .or_else(|| Some(dirs.home_dir().to_path_buf()))
}

/// Replace characters that are invalid in file names and bound the length
pub fn sanitize_filename(title: &str) -> Option<String> {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let mut name = replaced.trim().to_string();
    if name.len() > MAX_FILENAME_BYTES {
        let mut cut = MAX_FILENAME_BYTES;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }

    let name = name.trim_end().trim_matches('.').to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Deterministic clip name from the source stem and interval
fn default_clip_name(source: &Path, start: f64, end: f64) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "clip".to_string());
    let name = format!("{}_clip_{:.3}-{:.3}", stem, start, end);
    sanitize_filename(&name).unwrap_or_else(|| "clip".to_string())
}

/// Produces clip artifacts from a chat index and a source recording
#[derive(Clone)]
pub struct ClipExtractor {
    encoder: Arc<dyn VideoEncoder>,
    locator: ClipLocator,
}

impl ClipExtractor {
    pub fn new(encoder: Arc<dyn VideoEncoder>, locator: ClipLocator) -> Self {
        Self { encoder, locator }
    }

    pub fn locator(&self) -> &ClipLocator {
        &self.locator
    }

    /// Extract one clip.
    ///
    /// Invalid intervals and missing sources fail before the encoder is
    /// invoked. Encoder and chat-slice failures are reported in the returned
    /// [`ClipResult`]; a video that was cut is never discarded because the
    /// chat slice failed.
    pub async fn extract(&self, index: &ChatTimeIndex, request: &ClipRequest) -> Result<ClipResult> {
        let started = Instant::now();
        let (start, end, clamped) = resolve_interval(request)?;

        if !request.source.is_file() {
            return Err(ReplayError::NotFound(request.source.clone()));
        }

        let slice = index.query_range(start, end)?;

        let output_dir = self.locator.output_dir(&request.source);
        tokio::fs::create_dir_all(&output_dir).await?;

        let name = request
            .title
            .as_deref()
            .and_then(sanitize_filename)
            .unwrap_or_else(|| default_clip_name(&request.source, start, end));
        let video_path = output_dir.join(format!("{}.mp4", name));
        let chat_path = output_dir.join(format!("{}_chat.json", name));

        info!(
            "🎬 Extracting clip {} [{:.3}s, {:.3}s] with {} chat messages",
            name,
            start,
            end,
            slice.len()
        );

        let mut result = ClipResult {
            success: false,
            video_path: None,
            chat_path: None,
            start,
            end,
            clamped,
            chat_message_count: slice.len(),
            error_kind: None,
            error_message: None,
        };

        if let Err(e) = self.encoder.trim(&request.source, start, end, &video_path).await {
            error!("❌ Video cut failed for {}: {}", name, e);
            result.error_kind = Some(ClipErrorKind::Encoding);
            result.error_message = Some(e.to_string());
            return Ok(result);
        }
        result.video_path = Some(video_path);

        let written = write_chat_slice(slice, &chat_path).await;
        result.chat_path = Some(chat_path);
        if let Err(e) = written {
            warn!("⚠️ Video cut but chat slice failed for {}: {}", name, e);
            result.error_kind = Some(ClipErrorKind::Serialization);
            result.error_message = Some(e.to_string());
            return Ok(result);
        }
        result.success = true;

        info!("✅ Clip {} ready in {:.2}s", name, started.elapsed().as_secs_f64());
        Ok(result)
    }

    /// Clip videos already present in the output directory for `source`
    pub async fn list_clips(&self, source: &Path) -> Result<Vec<PathBuf>> {
        let dir = self.locator.output_dir(source);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut clips = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_clip = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| CLIP_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if is_clip && path.is_file() {
                clips.push(path);
            }
        }

        clips.sort();
        Ok(clips)
    }
}

/// Validate the requested interval and clamp it to the known duration
fn resolve_interval(request: &ClipRequest) -> Result<(f64, f64, bool)> {
    let (start, end) = (request.start, request.end);

    if !start.is_finite() || !end.is_finite() {
        return Err(ReplayError::invalid_range(start, end, "bounds must be finite"));
    }
    if start < 0.0 {
        return Err(ReplayError::invalid_range(start, end, "start must not be negative"));
    }
    if end <= start {
        return Err(ReplayError::invalid_range(start, end, "end must be after start"));
    }

    match request.source_duration.filter(|d| d.is_finite() && *d > 0.0) {
        Some(duration) if end > duration => {
            if start >= duration {
                return Err(ReplayError::invalid_range(
                    start,
                    end,
                    format!("start is beyond the video duration of {:.3}s", duration),
                ));
            }
            Ok((start, duration, true))
        }
        _ => Ok((start, end, false)),
    }
}
