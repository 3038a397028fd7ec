//! Export progress reporting.

use std::sync::Arc;

/// Progress callback for export rendering.
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Fraction complete in [0.0, 1.0].
    pub fraction: f64,

    /// Estimated time remaining, once enough frames were written to estimate.
    pub eta_secs: Option<f64>,

    /// Frames appended to the encoder so far.
    pub frames_written: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Current stage.
    pub stage: ExportStage,
}

impl ExportProgress {
    pub fn stage(stage: ExportStage, total_frames: u64) -> Self {
        Self {
            fraction: 0.0,
            eta_secs: None,
            frames_written: 0,
            total_frames,
            stage,
        }
    }

    pub fn complete(total_frames: u64) -> Self {
        Self {
            fraction: 1.0,
            eta_secs: Some(0.0),
            frames_written: total_frames,
            total_frames,
            stage: ExportStage::Complete,
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Draining,
    Finalizing,
    Complete,
}

impl ExportStage {
    pub fn label(self) -> &'static str {
        match self {
            ExportStage::Preparing => "preparing",
            ExportStage::Rendering => "rendering",
            ExportStage::Draining => "draining",
            ExportStage::Finalizing => "finalizing",
            ExportStage::Complete => "complete",
        }
    }
}

/// Call `callback` if present.
pub(crate) fn report(callback: Option<&ProgressCallback>, progress: ExportProgress) {
    if let Some(cb) = callback {
        cb(progress);
    }
}
