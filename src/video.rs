use crate::error::{ReplayError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Extensions recognized as stream recordings
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v", "ts"];

const HASH_CHUNK_SIZE: usize = 1024 * 1024;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Check if a path has a supported video extension
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// MD5 content hash of a file, streamed in chunks
pub async fn content_hash(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ReplayError::NotFound(path.to_path_buf()));
    }

    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }

    let hash = format!("{:x}", context.compute());
    debug!("🔑 Hashed {}: {}", path.display(), hash);
    Ok(hash)
}

/// Source of media metadata for recordings
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Total playback length in seconds
    async fn duration(&self, path: &Path) -> Result<f64>;
}

/// Duration probing through the `ffprobe` command line tool
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self {
            program: "ffprobe".to_string(),
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Use a specific ffprobe binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::new()
        }
    }

    /// Bound the runtime of a single probe
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration(&self, path: &Path) -> Result<f64> {
        if !path.exists() {
            return Err(ReplayError::NotFound(path.to_path_buf()));
        }

        let child = tokio::process::Command::new(&self.program)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg(path)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                ReplayError::Encoding(format!(
                    "{} timed out after {:?} on {}",
                    self.program,
                    self.timeout,
                    path.display()
                ))
            })?
            .map_err(|e| ReplayError::Encoding(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(ReplayError::Encoding(format!(
                "{} failed for {}",
                self.program,
                path.display()
            )));
        }

        let probe: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let duration = parse_probe_duration(&probe).ok_or_else(|| {
            ReplayError::Encoding(format!("no duration reported for {}", path.display()))
        })?;

        info!("📹 Probed {}: {:.1}s", path.display(), duration);
        Ok(duration)
    }
}

/// Read `format.duration` from ffprobe JSON output
fn parse_probe_duration(probe: &serde_json::Value) -> Option<f64> {
    let duration = &probe["format"]["duration"];
    duration
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| duration.as_f64())
        .filter(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_video_extension_detection() {
        assert!(is_video_file(Path::new("stream.MP4")));
        assert!(is_video_file(Path::new("dir/stream.mkv")));
        assert!(!is_video_file(Path::new("stream_chat.json")));
        assert!(!is_video_file(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_content_hash_matches_md5() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("video.mp4");
        tokio::fs::write(&path, b"mock video content").await.unwrap();

        let hash = content_hash(&path).await.unwrap();
        assert_eq!(hash, format!("{:x}", md5::compute(b"mock video content")));
    }

    #[tokio::test]
    async fn test_content_hash_missing_file() {
        let err = content_hash(Path::new("/definitely/not/here.mp4")).await.unwrap_err();
        assert!(matches!(err, ReplayError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_probe_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let video = temp_dir.path().join("video.mp4");
        tokio::fs::write(&video, b"mock video content").await.unwrap();
        let script = temp_dir.path().join("slow-probe.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = FfprobeProbe::with_program(script.to_string_lossy())
            .with_timeout(Duration::from_millis(200));
        let err = probe.duration(&video).await.unwrap_err();

        match err {
            ReplayError::Encoding(message) => assert!(message.contains("timed out"), "{}", message),
            other => panic!("expected an encoding error, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_duration_parsing() {
        let probe = serde_json::json!({ "format": { "duration": "3600.250000" } });
        assert_eq!(parse_probe_duration(&probe), Some(3600.25));

        let missing = serde_json::json!({ "format": {} });
        assert_eq!(parse_probe_duration(&missing), None);
    }
}
