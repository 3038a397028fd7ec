//! Output codec, resolution, frame rate, and container selection.

use serde::{Deserialize, Serialize};

/// Output video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    ProRes,
}

impl VideoCodec {
    /// Bits per pixel per frame used by the bitrate heuristic.
    fn bits_per_pixel(&self) -> Option<f64> {
        match self {
            VideoCodec::H264 => Some(0.06),
            VideoCodec::H265 => Some(0.04),
            VideoCodec::ProRes => None,
        }
    }

    /// Target bitrate in bits per second: `pixels * fps * k`.
    ///
    /// `None` for intra-frame codecs that are not bitrate driven.
    pub fn target_bitrate(&self, width: u32, height: u32, fps: f64) -> Option<u64> {
        let k = self.bits_per_pixel()?;
        Some((width as f64 * height as f64 * fps * k).round() as u64)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Some(VideoCodec::H264),
            "h265" | "hevc" => Some(VideoCodec::H265),
            "prores" => Some(VideoCodec::ProRes),
            _ => None,
        }
    }
}

/// Output width preset; height follows the canvas aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportResolution {
    #[default]
    Original,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "4k")]
    P2160,
}

impl ExportResolution {
    pub fn pixel_width(&self) -> Option<f64> {
        match self {
            ExportResolution::Original => None,
            ExportResolution::P720 => Some(1280.0),
            ExportResolution::P1080 => Some(1920.0),
            ExportResolution::P1440 => Some(2560.0),
            ExportResolution::P2160 => Some(3840.0),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "original" => Some(ExportResolution::Original),
            "720p" | "720" => Some(ExportResolution::P720),
            "1080p" | "1080" => Some(ExportResolution::P1080),
            "1440p" | "1440" => Some(ExportResolution::P1440),
            "4k" | "2160p" | "2160" => Some(ExportResolution::P2160),
            _ => None,
        }
    }
}

/// Output frame rate preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFps {
    #[default]
    Original,
    #[serde(rename = "24")]
    Fps24,
    #[serde(rename = "30")]
    Fps30,
    #[serde(rename = "60")]
    Fps60,
}

impl ExportFps {
    /// Frames per second, using `fallback` (the capture rate) for `Original`.
    pub fn value(&self, fallback: f64) -> f64 {
        match self {
            ExportFps::Original => fallback,
            ExportFps::Fps24 => 24.0,
            ExportFps::Fps30 => 30.0,
            ExportFps::Fps60 => 60.0,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "original" => Some(ExportFps::Original),
            "24" => Some(ExportFps::Fps24),
            "30" => Some(ExportFps::Fps30),
            "60" => Some(ExportFps::Fps60),
            _ => None,
        }
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Mp4,
    Mov,
}

impl ContainerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "mp4" => Some(ContainerFormat::Mp4),
            "mov" => Some(ContainerFormat::Mov),
            _ => None,
        }
    }
}

/// Everything the user picks in the export dialog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub codec: VideoCodec,
    pub resolution: ExportResolution,
    pub fps: ExportFps,
    pub format: ContainerFormat,
    pub audio_bitrate_kbps: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            resolution: ExportResolution::Original,
            fps: ExportFps::Original,
            format: ContainerFormat::Mp4,
            audio_bitrate_kbps: 320,
        }
    }
}

impl ExportSettings {
    /// ProRes only fits in QuickTime containers.
    pub fn effective_format(&self) -> ContainerFormat {
        if self.codec == VideoCodec::ProRes {
            ContainerFormat::Mov
        } else {
            self.format
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_heuristic() {
        let h264 = VideoCodec::H264.target_bitrate(1920, 1080, 30.0).unwrap();
        assert_eq!(h264, (1920.0 * 1080.0 * 30.0 * 0.06_f64).round() as u64);

        let hevc = VideoCodec::H265.target_bitrate(1920, 1080, 30.0).unwrap();
        assert!(hevc < h264);
        assert!(VideoCodec::ProRes.target_bitrate(1920, 1080, 30.0).is_none());
    }

    #[test]
    fn test_fps_fallback() {
        assert!((ExportFps::Original.value(29.97) - 29.97).abs() < 1e-9);
        assert!((ExportFps::Fps60.value(29.97) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_prores_forces_mov() {
        let settings = ExportSettings {
            codec: VideoCodec::ProRes,
            ..Default::default()
        };
        assert_eq!(settings.effective_format(), ContainerFormat::Mov);
        assert_eq!(ExportSettings::default().effective_format(), ContainerFormat::Mp4);
    }

    #[test]
    fn test_parse_cli_values() {
        assert_eq!(VideoCodec::parse("HEVC"), Some(VideoCodec::H265));
        assert_eq!(ExportResolution::parse("4k"), Some(ExportResolution::P2160));
        assert_eq!(ExportFps::parse("24"), Some(ExportFps::Fps24));
        assert_eq!(ContainerFormat::parse("mkv"), None);
    }

    #[test]
    fn test_settings_json_defaults() {
        let s: ExportSettings = serde_json::from_str(r#"{"codec":"h265"}"#).unwrap();
        assert_eq!(s.codec, VideoCodec::H265);
        assert_eq!(s.audio_bitrate_kbps, 320);
        let r: ExportResolution = serde_json::from_str("\"1080p\"").unwrap();
        assert_eq!(r, ExportResolution::P1080);
    }
}
