//! VOD Chat Replay
//!
//! Synchronizes recorded livestream chat with video playback: loads chat
//! exports into a time index for scrubbing, binds recordings to their chat
//! by content hash, and extracts clips whose video and chat share one window.

pub mod catalog;
pub mod chat;
pub mod clip;
pub mod config;
pub mod encoder;
pub mod error;
pub mod session;
pub mod video;

// Re-export main types for easy access
pub use crate::catalog::{CatalogListing, CatalogStore, DirectoryCatalog, ManifestCatalog, Stream, StreamMatcher};
pub use crate::chat::{Author, ChatLoader, ChatMessage, ChatTimeIndex, LoadOptions, ScrubWindow};
pub use crate::clip::{ClipErrorKind, ClipExtractor, ClipLocator, ClipRequest, ClipResult};
pub use crate::config::Config;
pub use crate::encoder::{FfmpegEncoder, VideoEncoder};
pub use crate::error::{ReplayError, Result};
pub use crate::session::{LoadSummary, ReplaySession, ReplaySnapshot};
pub use crate::video::{FfprobeProbe, MediaProbe};
