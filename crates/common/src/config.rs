//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Export pipeline tuning and defaults.
    pub export: ExportDefaults,

    /// Auto-zoom detector defaults.
    pub zoom: ZoomDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Export pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Memory the in-flight output frames may occupy (bytes).
    pub memory_budget_bytes: u64,

    /// Hard cap applied to the memory-derived in-flight frame count.
    pub max_in_flight_cap: usize,

    /// Render worker threads (0 = one per core).
    pub render_threads: usize,

    /// Written-frame interval between progress reports.
    pub progress_interval_frames: u64,

    /// Default video codec name ("h264", "h265", "prores").
    pub video_codec: String,

    /// Default AAC bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,

    /// Path to the ffprobe binary.
    pub ffprobe_path: String,
}

/// Auto-zoom defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomDefaults {
    pub zoom_level: f64,
    pub dwell_threshold_secs: f64,
    pub transition_duration_secs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            memory_budget_bytes: 1_500_000_000,
            max_in_flight_cap: 120,
            render_threads: 0,
            progress_interval_frames: 30,
            video_codec: "h264".to_string(),
            audio_bitrate_kbps: 320,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for ZoomDefaults {
    fn default() -> Self {
        Self {
            zoom_level: 2.0,
            dwell_threshold_secs: 0.5,
            transition_duration_secs: 0.4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reel").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"export": {"render_threads": 3}}"#).unwrap();
        assert_eq!(config.export.render_threads, 3);
        assert_eq!(config.export.max_in_flight_cap, 120);
        assert_eq!(config.export.progress_interval_frames, 30);
        assert!((config.zoom.zoom_level - 2.0).abs() < 1e-9);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from(std::path::Path::new("/nonexistent/reel/config.json"));
        assert_eq!(config.export.memory_budget_bytes, 1_500_000_000);
    }
}
