//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by the built-in conversion strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Scale factor used when rasterising PDF pages.
    #[serde(default = "default_raster_scale")]
    pub raster_scale: f32,

    /// JPEG quality (1-100) for JPEG targets.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Maximum characters placed on one slide when building presentations.
    #[serde(default = "default_slide_char_limit")]
    pub slide_char_limit: usize,

    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Temporary directory for staging video files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Timeout for a single video remux in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
}

fn default_raster_scale() -> f32 {
    2.0
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_slide_char_limit() -> usize {
    750
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("docshift-video")
}

fn default_timeout() -> u64 {
    600 // 10 minutes
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            raster_scale: default_raster_scale(),
            jpeg_quality: default_jpeg_quality(),
            slide_char_limit: default_slide_char_limit(),
            ffmpeg_path: default_ffmpeg_path(),
            temp_dir: default_temp_dir(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
        }
    }
}

impl ConverterConfig {
    /// Sets the ffmpeg binary path.
    pub fn with_ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = path;
        self
    }

    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the PDF rasterisation scale.
    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale;
        self
    }

    /// Sets the JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Sets the slide character limit.
    pub fn with_slide_char_limit(mut self, limit: usize) -> Self {
        self.slide_char_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.raster_scale, 2.0);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.slide_char_limit, 750);
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::default()
            .with_ffmpeg_path(PathBuf::from("/usr/local/bin/ffmpeg"))
            .with_temp_dir(PathBuf::from("/tmp/test"))
            .with_timeout(30)
            .with_raster_scale(1.5)
            .with_slide_char_limit(300);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.temp_dir, PathBuf::from("/tmp/test"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.raster_scale, 1.5);
        assert_eq!(config.slide_char_limit, 300);
    }

    #[test]
    fn test_config_serialization() {
        let config = ConverterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ConverterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.jpeg_quality, config.jpeg_quality);
        assert_eq!(parsed.slide_char_limit, config.slide_char_limit);
    }
}
