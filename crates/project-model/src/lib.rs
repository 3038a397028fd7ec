//! Reel Project Model
//!
//! Defines the data contracts consumed by the export engine:
//! - **Recording:** The media files a finished capture produced
//! - **Cursor:** Recorded pointer samples, clicks, and keystrokes
//! - **Zoom:** Keyframes and the interpolating zoom timeline
//! - **Style / Export:** Background, cursor, camera, and output settings
//! - **Editor:** The flat, serializable editor state record
//!
//! Normalized coordinates are in `[0.0, 1.0]` relative to the capture
//! area, with `(0, 0)` at the top-left. Pixel geometry lives in
//! [`geometry`] and uses the same top-left origin.

pub mod cursor;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod gradients;
pub mod recording;
pub mod style;
pub mod viewport;
pub mod zoom;

pub use cursor::*;
pub use editor::*;
pub use error::*;
pub use export::*;
pub use geometry::*;
pub use gradients::*;
pub use recording::*;
pub use style::*;
pub use viewport::*;
pub use zoom::*;
