//! Reel Render Engine
//!
//! Offline export pipeline that composites a screen recording with
//! editing decisions (background, zoom, cursor, clicks, webcam) into a
//! final encoded video file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! screen.mp4 ──┐
//!              ├── frame matching ── render workers (rayon) ──┐
//! webcam.mp4 ──┘   (latest ≤ t)      background / zoom /      │
//!                                     cursor / clicks / camera │
//!                                                              ▼
//!                                                  OrderedFrameWriter
//!                                                              │
//! system.wav ──┐                                               ▼
//!              ├── TrackAssembler ─────────────────────► ffmpeg encode + mux
//! mic.wav ─────┘                                               │
//!                                                              ▼
//!                                                         output.mp4
//! ```
//!
//! Memory is bounded by a fixed pool of output buffers and a counting
//! slot gate: a frame's slot is released only once the encoder has it.

pub mod audio;
pub mod background;
pub mod backpressure;
pub mod camera;
pub mod cancel;
pub mod compositor;
pub mod export;
pub mod ffmpeg;
pub mod frame;
pub mod instruction;
pub mod media;
pub mod overlay;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod raster;
pub mod writer;

pub use cancel::CancelToken;
pub use compositor::{render, render_frame, FrameComposition};
pub use export::*;
pub use ffmpeg::FfmpegBackend;
pub use frame::PixelBuffer;
pub use instruction::{CompositionInstruction, InstructionInputs};
pub use media::*;
pub use pipeline::{
    ParallelExportPipeline, PipelineConfig, PipelineMonitor, PipelineSources, PipelineState,
    PipelineStats,
};
pub use progress::{ExportProgress, ExportStage, ProgressCallback};
