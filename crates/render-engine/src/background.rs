//! Canvas backgrounds.
//!
//! Gradients and images are rasterized once per export into a shared
//! bitmap at render size; solid colours are filled on every frame.

use std::sync::Arc;

use reel_common::error::ExportResult;
use reel_project_model::geometry::{Rect, Size};
use reel_project_model::gradients::GradientPreset;
use reel_project_model::style::{BackgroundImageFillMode, BackgroundStyle, RgbaColor};

use crate::frame::PixelBuffer;
use crate::raster::Canvas;

/// A background resolved for one export.
#[derive(Debug, Clone, Default)]
pub enum BackgroundFill {
    #[default]
    None,
    Solid(RgbaColor),
    Bitmap(Arc<PixelBuffer>),
}

impl BackgroundFill {
    /// Resolve `style` for a `width` x `height` canvas.
    ///
    /// `image` is the decoded background picture for [`BackgroundStyle::Image`];
    /// without it the image style falls back to no background. A gradient id
    /// with no known stops renders opaque black.
    pub fn prepare(
        style: &BackgroundStyle,
        fill_mode: BackgroundImageFillMode,
        width: u32,
        height: u32,
        image: Option<&PixelBuffer>,
    ) -> ExportResult<Self> {
        match style {
            BackgroundStyle::None => Ok(BackgroundFill::None),
            BackgroundStyle::SolidColor { color } => Ok(BackgroundFill::Solid(*color)),
            BackgroundStyle::Gradient { gradient_id } => {
                let mut bitmap = PixelBuffer::try_new(width, height)?;
                match GradientPreset::by_id(*gradient_id) {
                    Some(preset) if !preset.stops.is_empty() => {
                        let mut canvas = Canvas::new(&mut bitmap);
                        let bounds = canvas.bounds();
                        let start = (preset.start.x * bounds.width, preset.start.y * bounds.height);
                        let end = (preset.end.x * bounds.width, preset.end.y * bounds.height);
                        canvas.fill_linear_gradient(bounds, &preset.colors(), start, end);
                    }
                    _ => {
                        tracing::warn!(gradient_id, "Unknown gradient, using black background");
                        bitmap.fill(RgbaColor::BLACK.to_rgba8());
                    }
                }
                Ok(BackgroundFill::Bitmap(Arc::new(bitmap)))
            }
            BackgroundStyle::Image { filename } => {
                let Some(image) = image.filter(|i| !i.is_empty()) else {
                    tracing::warn!(filename = %filename, "Background image unavailable, drawing none");
                    return Ok(BackgroundFill::None);
                };
                let mut bitmap = PixelBuffer::try_new(width, height)?;
                let mut canvas = Canvas::new(&mut bitmap);
                let bounds = canvas.bounds();
                canvas.clear(RgbaColor::BLACK);
                let dest = match fill_mode {
                    BackgroundImageFillMode::Fill => bounds.aspect_fill(image.size()),
                    BackgroundImageFillMode::Fit => bounds.aspect_fit(image.size()),
                };
                canvas.draw_image(image, dest);
                Ok(BackgroundFill::Bitmap(Arc::new(bitmap)))
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, BackgroundFill::None)
    }

    /// Paint into `rect` under the canvas's current transform and clip.
    pub fn draw(&self, canvas: &mut Canvas<'_>, rect: Rect) {
        match self {
            BackgroundFill::None => {}
            BackgroundFill::Solid(color) => canvas.fill_rect(rect, *color),
            BackgroundFill::Bitmap(bitmap) => canvas.draw_image(bitmap, rect),
        }
    }

    /// Pixel size of a pre-rendered bitmap.
    pub fn bitmap_size(&self) -> Option<Size> {
        match self {
            BackgroundFill::Bitmap(bitmap) => Some(bitmap.size()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_gradient_is_black() {
        let fill = BackgroundFill::prepare(
            &BackgroundStyle::Gradient { gradient_id: 9_999 },
            BackgroundImageFillMode::Fill,
            8,
            4,
            None,
        )
        .unwrap();
        let BackgroundFill::Bitmap(bitmap) = fill else {
            panic!("expected bitmap");
        };
        assert_eq!(bitmap.pixel(3, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn test_known_gradient_prerenders_at_size() {
        let fill = BackgroundFill::prepare(
            &BackgroundStyle::Gradient { gradient_id: 1 },
            BackgroundImageFillMode::Fill,
            32,
            16,
            None,
        )
        .unwrap();
        assert_eq!(fill.bitmap_size(), Some(Size::new(32.0, 16.0)));
    }

    #[test]
    fn test_solid_fill_paints_rect() {
        let fill = BackgroundFill::prepare(
            &BackgroundStyle::SolidColor {
                color: RgbaColor::rgb(1.0, 0.0, 0.0),
            },
            BackgroundImageFillMode::Fill,
            4,
            4,
            None,
        )
        .unwrap();
        let mut buf = PixelBuffer::new(4, 4);
        let mut canvas = Canvas::new(&mut buf);
        let bounds = canvas.bounds();
        fill.draw(&mut canvas, bounds);
        assert_eq!(buf.pixel(1, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_missing_image_falls_back_to_none() {
        let fill = BackgroundFill::prepare(
            &BackgroundStyle::Image {
                filename: "wallpaper.png".into(),
            },
            BackgroundImageFillMode::Fit,
            4,
            4,
            None,
        )
        .unwrap();
        assert!(fill.is_none());
    }

    #[test]
    fn test_fit_image_letterboxes_black() {
        let image = PixelBuffer::filled(2, 2, [0, 255, 0, 255]);
        let fill = BackgroundFill::prepare(
            &BackgroundStyle::Image {
                filename: "square.png".into(),
            },
            BackgroundImageFillMode::Fit,
            16,
            8,
            Some(&image),
        )
        .unwrap();
        let BackgroundFill::Bitmap(bitmap) = fill else {
            panic!("expected bitmap");
        };
        assert_eq!(bitmap.pixel(0, 4), [0, 0, 0, 255]);
        assert_eq!(bitmap.pixel(8, 4)[1], 255);
    }
}
