//! RGBA8 pixel buffers.

use std::fmt;

use reel_common::error::{ExportError, ExportResult};
use reel_project_model::geometry::Size;

/// Bytes per pixel (RGBA, 8 bits per channel, straight alpha).
pub const BYTES_PER_PIXEL: usize = 4;

/// A tightly packed, top-left origin RGBA8 image.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Transparent buffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::bytes_for(width, height)],
        }
    }

    /// Like [`PixelBuffer::new`] but reports allocation failure instead of aborting.
    pub fn try_new(width: u32, height: u32) -> ExportResult<Self> {
        let len = Self::bytes_for(width, height);
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            ExportError::exhausted(format!("cannot allocate {width}x{height} frame: {e}"))
        })?;
        data.resize(len, 0);
        Ok(Self { width, height, data })
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut buf = Self::new(width, height);
        buf.fill(rgba);
        buf
    }

    /// Wrap raw RGBA bytes; `data` must hold exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> ExportResult<Self> {
        let expected = Self::bytes_for(width, height);
        if data.len() != expected {
            return Err(ExportError::invalid(format!(
                "pixel data is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn bytes_for(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Pixel at `(x, y)`; transparent outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let o = self.offset(x, y);
        [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let o = self.offset(x, y);
        self.data[o..o + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
        let err = PixelBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, ExportError::InvalidRequest { .. }));
    }

    #[test]
    fn test_pixel_access() {
        let mut buf = PixelBuffer::filled(3, 2, [1, 2, 3, 255]);
        assert_eq!(buf.pixel(2, 1), [1, 2, 3, 255]);
        buf.set_pixel(1, 1, [9, 9, 9, 9]);
        assert_eq!(buf.pixel(1, 1), [9, 9, 9, 9]);
        assert_eq!(buf.pixel(5, 5), [0, 0, 0, 0]);
        buf.clear();
        assert_eq!(buf.pixel(2, 1), [0, 0, 0, 0]);
    }
}
