//! Reel Processing Core
//!
//! Analyzes recorded cursor metadata ahead of, and during, export:
//! - **Cursor Metadata:** Immutable, thread-safe position/click lookup
//! - **Cursor Smoothing:** Spring-physics smoothing of the pointer path
//! - **Zoom Detection:** Click clustering into zoom keyframe envelopes
//!
//! This crate is pure computation apart from loading the metadata file.
//! All inputs are data; all outputs are data.

pub mod cursor_metadata;
pub mod cursor_smooth;
pub mod zoom_detector;

pub use cursor_metadata::{ActiveClick, CursorLookup, CursorMetadataProvider, CursorMetadataSnapshot};
pub use cursor_smooth::CursorSmoother;
pub use zoom_detector::{ClickRegion, ZoomDetector, ZoomDetectorConfig};
