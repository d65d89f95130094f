//! External video trimming
//!
//! The core never decodes frames; cutting is delegated to an encoder
//! collaborator behind [`VideoEncoder`].

use crate::config::ClipConfig;
use crate::error::{ReplayError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Cuts `[start, end]` seconds of a source video into a new file
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn trim(&self, source: &Path, start: f64, end: f64, dest: &Path) -> Result<()>;
}

/// Trimming through the `ffmpeg` command line tool
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: String,
    video_codec: String,
    audio_codec: String,
    audio_bitrate: String,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(config: &ClipConfig) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            timeout: Duration::from_secs(config.encoder_timeout_secs),
        }
    }

    /// Use a specific ffmpeg binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Bound the runtime of a single cut
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn arguments(&self, source: &Path, start: f64, end: f64, dest: &Path) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format_ffmpeg_time(start),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-t".to_string(),
            format_ffmpeg_time(end - start),
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-y".to_string(),
            dest.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn trim(&self, source: &Path, start: f64, end: f64, dest: &Path) -> Result<()> {
        let args = self.arguments(source, start, end, dest);
        debug!("{} {}", self.program, args.join(" "));
        info!("✂️ Cutting {:.3}s..{:.3}s from {}", start, end, source.display());

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                ReplayError::Encoding(format!("{} timed out after {:?}", self.program, self.timeout))
            })?
            .map_err(|e| ReplayError::Encoding(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReplayError::Encoding(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Format seconds as `HH:MM:SS.mmm`
pub fn format_ffmpeg_time(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    #[test]
    fn test_ffmpeg_time_format() {
        assert_eq!(format_ffmpeg_time(0.0), "00:00:00.000");
        assert_eq!(format_ffmpeg_time(4.5), "00:00:04.500");
        assert_eq!(format_ffmpeg_time(3723.042), "01:02:03.042");
    }

    #[test]
    fn test_ffmpeg_arguments() {
        let encoder = FfmpegEncoder::new(&Config::default().clips);
        let args = encoder.arguments(Path::new("in.mp4"), 4.0, 10.0, &PathBuf::from("out.mp4"));

        assert_eq!(args[0..2], ["-ss".to_string(), "00:00:04.000".to_string()]);
        assert_eq!(args[4..6], ["-t".to_string(), "00:00:06.000".to_string()]);
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_encoding_error() {
        let encoder = FfmpegEncoder::new(&Config::default().clips)
            .with_program("definitely-not-an-encoder-binary");
        let err = encoder
            .trim(Path::new("in.mp4"), 0.0, 1.0, Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReplayError::Encoding(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_encoder_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let script = temp_dir.path().join("slow-encoder.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let encoder = FfmpegEncoder::new(&Config::default().clips)
            .with_program(script.to_string_lossy())
            .with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = encoder
            .trim(Path::new("in.mp4"), 0.0, 1.0, &temp_dir.path().join("out.mp4"))
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            ReplayError::Encoding(message) => assert!(message.contains("timed out"), "{}", message),
            other => panic!("expected an encoding error, got {:?}", other),
        }
    }
}
