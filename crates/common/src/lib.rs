//! Reel Common Utilities
//!
//! Shared infrastructure for all Reel crates:
//! - Error types and result aliases (including the export error taxonomy)
//! - Export clock, frame-index math and ETA estimation
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
