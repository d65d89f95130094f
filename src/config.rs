use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::TimestampUnit;

/// Configuration for the chat replay engine.
///
/// Every section and field is optional in a config file; anything left out
/// keeps its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat loading and scrubbing settings
    pub chat: ChatConfig,

    /// Clip extraction settings
    pub clips: ClipConfig,

    /// Stream catalog settings
    pub catalog: CatalogConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Window used when a caller does not supply one (seconds)
    pub default_window_secs: f64,

    /// Unit of absolute timestamps in exports
    pub timestamp_unit: TimestampUnit,
}

/// Where clip artifacts are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStorage {
    /// `vod-clips` inside the user's Videos directory
    VideosDir,

    /// `clips` folder next to the source video
    SourceVideoDir,

    /// `custom_dir`, or `<app_data_dir>/clips` when unset
    CustomDir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Storage location policy
    pub storage: ClipStorage,

    /// Directory used with `ClipStorage::CustomDir`
    pub custom_dir: Option<PathBuf>,

    /// Application data directory (fallback clip location)
    pub app_data_dir: PathBuf,

    /// Encoder video codec
    pub video_codec: String,

    /// Encoder audio codec
    pub audio_codec: String,

    /// Encoder audio bitrate
    pub audio_bitrate: String,

    /// Maximum encoder runtime per clip (seconds)
    pub encoder_timeout_secs: u64,

    /// Maximum number of clips extracted at once
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding the video metadata cache
    pub cache_dir: PathBuf,

    /// Directory scanned for recordings
    pub scan_dir: Option<PathBuf>,

    /// JSON manifest of streams and chat bindings
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level for this crate
    pub level: String,
}

impl Config {
    /// Load configuration from the first well-known file that exists,
    /// falling back to environment variables when there is none.
    ///
    /// A config file that exists but does not parse is an error.
    pub fn load() -> Result<Self> {
        Self::load_first(&[
            Path::new("vod-chat-replay.toml"),
            Path::new("config/vod-chat-replay.toml"),
        ])
    }

    fn load_first(config_paths: &[&Path]) -> Result<Self> {
        for path in config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                let config = toml::from_str(&config_str)
                    .map_err(|e| anyhow!("Cannot parse config file {}: {}", path.display(), e))?;
                tracing::info!("📄 Loaded configuration from: {}", path.display());
                return Ok(config);
            }
        }

        Self::from_env()
    }

    /// Load a configuration file from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Cannot parse {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(window) = std::env::var("VOD_REPLAY_WINDOW") {
            config.chat.default_window_secs = window
                .parse()
                .map_err(|e| anyhow!("VOD_REPLAY_WINDOW: {}", e))?;
        }

        if let Ok(dir) = std::env::var("VOD_REPLAY_CLIPS_DIR") {
            config.clips.storage = ClipStorage::CustomDir;
            config.clips.custom_dir = Some(PathBuf::from(dir));
        }

        if let Ok(timeout) = std::env::var("VOD_REPLAY_ENCODER_TIMEOUT") {
            config.clips.encoder_timeout_secs = timeout
                .parse()
                .map_err(|e| anyhow!("VOD_REPLAY_ENCODER_TIMEOUT: {}", e))?;
        }

        if let Ok(dir) = std::env::var("VOD_REPLAY_SCAN_DIR") {
            config.catalog.scan_dir = Some(PathBuf::from(dir));
        }

        if let Ok(log_level) = std::env::var("VOD_REPLAY_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.chat.default_window_secs.is_finite() || self.chat.default_window_secs < 0.0 {
            return Err(anyhow!("default_window_secs must be a non-negative number"));
        }

        if self.clips.max_concurrent == 0 {
            return Err(anyhow!("max_concurrent must be greater than 0"));
        }

        if self.clips.encoder_timeout_secs == 0 {
            return Err(anyhow!("encoder_timeout_secs must be greater than 0"));
        }

        if self.clips.storage == ClipStorage::CustomDir && self.clips.custom_dir.is_none() {
            tracing::warn!(
                "custom_dir not set, clips will be stored in {}",
                self.clips.app_data_dir.join("clips").display()
            );
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Chat Replay Configuration:\n\
            - Default Window: {}s\n\
            - Timestamp Unit: {:?}\n\
            - Clip Storage: {:?}\n\
            - Encoder: {} / {} @ {}\n\
            - Encoder Timeout: {}s\n\
            - Concurrent Clips: {}\n\
            - Cache Directory: {}",
            self.chat.default_window_secs,
            self.chat.timestamp_unit,
            self.clips.storage,
            self.clips.video_codec,
            self.clips.audio_codec,
            self.clips.audio_bitrate,
            self.clips.encoder_timeout_secs,
            self.clips.max_concurrent,
            self.catalog.cache_dir.display(),
        )
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_window_secs: 5.0,
            timestamp_unit: TimestampUnit::Milliseconds,
        }
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            storage: ClipStorage::VideosDir,
            custom_dir: None,
            app_data_dir: PathBuf::from("./data"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            encoder_timeout_secs: 600, // 10 minutes
            max_concurrent: num_cpus::get().clamp(1, 2),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            scan_dir: None,
            manifest_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_window(mut self, seconds: f64) -> Self {
        self.config.chat.default_window_secs = seconds;
        self
    }

    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.config.chat.timestamp_unit = unit;
        self
    }

    pub fn with_clip_storage(mut self, storage: ClipStorage) -> Self {
        self.config.clips.storage = storage;
        self
    }

    pub fn with_custom_clip_dir(mut self, dir: PathBuf) -> Self {
        self.config.clips.storage = ClipStorage::CustomDir;
        self.config.clips.custom_dir = Some(dir);
        self
    }

    pub fn with_app_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.clips.app_data_dir = dir;
        self
    }

    pub fn with_max_concurrent(mut self, clips: usize) -> Self {
        self.config.clips.max_concurrent = clips;
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.catalog.cache_dir = dir;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chat.default_window_secs, 5.0);
        assert_eq!(config.chat.timestamp_unit, TimestampUnit::Milliseconds);
        assert_eq!(config.clips.storage, ClipStorage::VideosDir);
        assert!(config.clips.max_concurrent >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_window(2.5)
            .with_custom_clip_dir(PathBuf::from("/tmp/clips"))
            .with_max_concurrent(4)
            .build();

        assert_eq!(config.chat.default_window_secs, 2.5);
        assert_eq!(config.clips.storage, ClipStorage::CustomDir);
        assert_eq!(config.clips.custom_dir, Some(PathBuf::from("/tmp/clips")));
        assert_eq!(config.clips.max_concurrent, 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
        assert!(ConfigBuilder::new().with_window(-1.0).build().validate().is_err());
        assert!(ConfigBuilder::new().with_max_concurrent(0).build().validate().is_err());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let text = "[chat]\ndefault_window_secs = 2.0\ntimestamp_unit = \"seconds\"\n";
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(config.chat.default_window_secs, 2.0);
        assert_eq!(config.chat.timestamp_unit, TimestampUnit::Seconds);
        assert_eq!(config.clips.video_codec, "libx264");
        assert_eq!(config.clips.encoder_timeout_secs, 600);
        assert_eq!(config.logging.level, "info");

        let clips_only: Config = toml::from_str("[clips]\nstorage = \"custom_dir\"\n").unwrap();
        assert_eq!(clips_only.clips.storage, ClipStorage::CustomDir);
        assert_eq!(clips_only.clips.audio_bitrate, "128k");
        assert_eq!(clips_only.chat.default_window_secs, 5.0);
    }

    #[test]
    fn test_unparseable_config_file_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("vod-chat-replay.toml");
        std::fs::write(&path, "[chat]\ndefault_window_secs = \"soon\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Cannot parse"));

        let missing = temp_dir.path().join("missing.toml");
        let err = Config::load_first(&[missing.as_path(), path.as_path()]).unwrap_err();
        assert!(err.to_string().contains("Cannot parse config file"));
    }

    #[test]
    fn test_first_existing_config_file_wins() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("vod-chat-replay.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let missing = temp_dir.path().join("missing.toml");
        let config = Config::load_first(&[missing.as_path(), path.as_path()]).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.chat.default_window_secs, 5.0);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = ConfigBuilder::new().with_clip_storage(ClipStorage::SourceVideoDir).build();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("storage = \"source_video_dir\""));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.clips.storage, ClipStorage::SourceVideoDir);
    }
}
