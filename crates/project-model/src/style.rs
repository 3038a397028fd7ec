//! Visual style settings: colours, backgrounds, cursor, and camera options.

use serde::{Deserialize, Serialize};

use crate::geometry::Size;
use crate::gradients::GradientPreset;

/// Straight-alpha RGBA colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbaColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl RgbaColor {
    pub const BLACK: RgbaColor = RgbaColor::rgb(0.0, 0.0, 0.0);
    pub const WHITE: RgbaColor = RgbaColor::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// From `0xRRGGBB`.
    pub fn from_hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xFF) as f64 / 255.0,
            ((hex >> 8) & 0xFF) as f64 / 255.0,
            (hex & 0xFF) as f64 / 255.0,
        )
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Quantize to 8-bit RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        fn q(v: f64) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// What fills the canvas behind the screen recording.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundStyle {
    #[default]
    None,
    Gradient {
        #[serde(rename = "gradientId")]
        gradient_id: u32,
    },
    SolidColor {
        color: RgbaColor,
    },
    Image {
        filename: String,
    },
}

impl BackgroundStyle {
    pub fn is_none(&self) -> bool {
        matches!(self, BackgroundStyle::None)
    }

    /// Colour stops for gradient and solid styles; empty otherwise.
    pub fn color_stops(&self) -> Vec<RgbaColor> {
        match self {
            BackgroundStyle::Gradient { gradient_id } => GradientPreset::by_id(*gradient_id)
                .map(|p| p.colors())
                .unwrap_or_default(),
            BackgroundStyle::SolidColor { color } => vec![*color],
            BackgroundStyle::None | BackgroundStyle::Image { .. } => Vec::new(),
        }
    }
}

/// How a background image covers the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundImageFillMode {
    #[default]
    Fill,
    Fit,
}

/// Cursor glyph drawn over the screen recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorStyle {
    #[default]
    Arrow,
    Crosshair,
    CircleDot,
}

/// Windowed-average cursor smoothing; the value is the window size in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorSmoothing {
    Rapid,
    Quick,
    #[default]
    Standard,
    Slow,
}

impl CursorSmoothing {
    pub fn window(&self) -> usize {
        match self {
            CursorSmoothing::Rapid => 2,
            CursorSmoothing::Quick => 4,
            CursorSmoothing::Standard => 8,
            CursorSmoothing::Slow => 16,
        }
    }
}

/// Damped-spring parameters for cursor movement smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub tension: f64,
    pub friction: f64,
    pub mass: f64,
    /// Seconds before a click during which the cursor converges onto it.
    pub convergence_secs: f64,
}

/// Preset cursor movement speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorMovementSpeed {
    Slow,
    #[default]
    Medium,
    Fast,
    Rapid,
}

impl CursorMovementSpeed {
    pub fn spring(&self) -> SpringParams {
        let (tension, friction, mass, convergence_secs) = match self {
            CursorMovementSpeed::Slow => (80.0, 20.0, 3.0, 0.3),
            CursorMovementSpeed::Medium => (170.0, 26.0, 1.5, 0.2),
            CursorMovementSpeed::Fast => (300.0, 34.0, 1.0, 0.15),
            CursorMovementSpeed::Rapid => (500.0, 44.0, 0.6, 0.1),
        };
        SpringParams {
            tension,
            friction,
            mass,
            convergence_secs,
        }
    }
}

/// Output canvas shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanvasAspect {
    #[default]
    Original,
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[serde(rename = "4:3")]
    Ratio4x3,
    #[serde(rename = "1:1")]
    Ratio1x1,
    #[serde(rename = "9:16")]
    Ratio9x16,
}

impl CanvasAspect {
    pub fn ratio(&self) -> Option<f64> {
        match self {
            CanvasAspect::Original => None,
            CanvasAspect::Ratio16x9 => Some(16.0 / 9.0),
            CanvasAspect::Ratio4x3 => Some(4.0 / 3.0),
            CanvasAspect::Ratio1x1 => Some(1.0),
            CanvasAspect::Ratio9x16 => Some(9.0 / 16.0),
        }
    }

    /// Smallest canvas of this aspect that contains `screen`, or `None` for `Original`.
    pub fn size_for(&self, screen: Size) -> Option<Size> {
        let ratio = self.ratio()?;
        if screen.aspect_ratio() < ratio {
            Some(Size::new(screen.height * ratio, screen.height))
        } else {
            Some(Size::new(screen.width, screen.width / ratio))
        }
    }
}

/// Aspect applied to the webcam image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraAspect {
    #[default]
    Original,
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[serde(rename = "4:3")]
    Ratio4x3,
    #[serde(rename = "1:1")]
    Square,
}

impl CameraAspect {
    /// Width divided by height.
    pub fn aspect_ratio(&self, webcam: Size) -> f64 {
        match self {
            CameraAspect::Original => webcam.aspect_ratio(),
            CameraAspect::Ratio16x9 => 16.0 / 9.0,
            CameraAspect::Ratio4x3 => 4.0 / 3.0,
            CameraAspect::Square => 1.0,
        }
    }

    /// Height divided by width.
    pub fn height_to_width(&self, webcam: Size) -> f64 {
        let ratio = self.aspect_ratio(webcam);
        if ratio <= 0.0 {
            0.75
        } else {
            1.0 / ratio
        }
    }
}

/// Fit or fill policy for the fullscreen webcam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FullscreenFillMode {
    Fit,
    #[default]
    Fill,
}

/// Animation used when the webcam enters or leaves fullscreen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionTransitionKind {
    #[default]
    None,
    Fade,
    Scale,
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionTransition {
    pub kind: RegionTransitionKind,
    pub duration_secs: f64,
}

impl Default for RegionTransition {
    fn default() -> Self {
        Self {
            kind: RegionTransitionKind::None,
            duration_secs: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_style_tagged_json() {
        let style = BackgroundStyle::Gradient { gradient_id: 3 };
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(json, r#"{"type":"gradient","gradientId":3}"#);

        let solid: BackgroundStyle =
            serde_json::from_str(r#"{"type":"solidColor","color":{"r":1,"g":0,"b":0}}"#).unwrap();
        assert_eq!(
            solid,
            BackgroundStyle::SolidColor {
                color: RgbaColor::rgb(1.0, 0.0, 0.0)
            }
        );
        assert!(BackgroundStyle::default().is_none());
    }

    #[test]
    fn test_color_stops() {
        assert_eq!(BackgroundStyle::Gradient { gradient_id: 0 }.color_stops().len(), 3);
        assert!(BackgroundStyle::Gradient { gradient_id: 4242 }
            .color_stops()
            .is_empty());
        assert!(BackgroundStyle::None.color_stops().is_empty());
    }

    #[test]
    fn test_hex_color() {
        let c = RgbaColor::from_hex(0xFF8000);
        assert_eq!(c.to_rgba8(), [255, 128, 0, 255]);
    }

    #[test]
    fn test_smoothing_windows() {
        assert_eq!(CursorSmoothing::Rapid.window(), 2);
        assert_eq!(CursorSmoothing::Slow.window(), 16);
    }

    #[test]
    fn test_canvas_aspect_contains_screen() {
        let screen = Size::new(1440.0, 900.0);
        let c = CanvasAspect::Ratio16x9.size_for(screen).unwrap();
        assert!((c.width - 1600.0).abs() < 1e-9);
        assert!((c.height - 900.0).abs() < 1e-9);

        let sq = CanvasAspect::Ratio1x1.size_for(screen).unwrap();
        assert!((sq.width - 1440.0).abs() < 1e-9);
        assert!((sq.height - 1440.0).abs() < 1e-9);
        assert!(CanvasAspect::Original.size_for(screen).is_none());
    }

    #[test]
    fn test_camera_aspect() {
        let webcam = Size::new(640.0, 480.0);
        assert!((CameraAspect::Original.height_to_width(webcam) - 0.75).abs() < 1e-9);
        assert!((CameraAspect::Square.height_to_width(webcam) - 1.0).abs() < 1e-9);
    }
}
