//! Media backend seams.
//!
//! The pipeline only talks to decoders, encoders, and containers through
//! these traits. [`crate::ffmpeg::FfmpegBackend`] implements them with
//! subprocesses; tests use in-memory implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reel_common::error::ExportResult;
use reel_project_model::export::{ContainerFormat, VideoCodec};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::frame::PixelBuffer;

/// One decoded video frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Presentation time, relative to the start of the opened window.
    pub pts_secs: f64,
    pub image: Arc<PixelBuffer>,
}

/// Time-ordered source of decoded frames.
pub trait VideoDecoder: Send {
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> ExportResult<Option<DecodedFrame>>;
}

/// Interleaved f32 PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub sample_rate: u32,
    pub channels: u16,
    /// Presentation time of the first sample.
    pub start_secs: f64,
    pub samples: Vec<f32>,
}

impl AudioChunk {
    /// Sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

/// Time-ordered source of audio chunks.
pub trait AudioReader: Send {
    fn next_chunk(&mut self) -> ExportResult<Option<AudioChunk>>;
}

/// Encoder input for the video track.
pub trait FrameSink: Send {
    /// Append one frame. Called with strictly increasing `index`.
    ///
    /// Blocks while the encoder is backed up and returns `Cancelled` if
    /// `cancel` fires in the meantime.
    fn append(
        &mut self,
        index: u64,
        pts_secs: f64,
        frame: &PixelBuffer,
        cancel: &CancelToken,
    ) -> ExportResult<()>;

    /// Mark the video input complete.
    fn finish(&mut self) -> ExportResult<()>;
}

/// Encoder input for the audio track.
pub trait AudioSink: Send {
    fn append(&mut self, chunk: &AudioChunk) -> ExportResult<()>;
    fn finish(&mut self) -> ExportResult<()>;
}

/// The output container once its inputs are complete.
pub trait ContainerWriter: Send {
    /// Write the final file to the destination.
    ///
    /// Returns `Cancelled` without touching the destination if `cancel`
    /// fires before the file is in place.
    fn finalize(self: Box<Self>, cancel: &CancelToken) -> ExportResult<()>;

    /// Stop all encoding and discard partial output.
    fn abort(self: Box<Self>);
}

/// Everything a writer hands to the pipeline.
pub struct WriterHandles {
    pub video: Box<dyn FrameSink>,
    pub audio: Option<Box<dyn AudioSink>>,
    pub container: Box<dyn ContainerWriter>,
}

/// What a writer should produce.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub destination: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: VideoCodec,
    pub format: ContainerFormat,
    /// Video bitrate in bits per second; `None` for intra-frame codecs.
    pub video_bitrate: Option<u64>,
    /// `None` when no audio track is written.
    pub audio: Option<AudioOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioOutput {
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate_kbps: u32,
}

/// Probed properties of a source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub codec: String,
}

/// A media toolkit able to decode sources and write the output.
pub trait MediaBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend is usable on the system.
    fn is_available(&self) -> bool;

    fn probe(&self, path: &Path) -> ExportResult<MediaInfo>;

    /// Decode `[start, start + duration)` of the first video stream at its
    /// native size. Frame times are relative to `start_secs`.
    fn open_video(
        &self,
        path: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> ExportResult<Box<dyn VideoDecoder>>;

    /// Decode `[start, start + duration)` of the first audio stream as
    /// stereo f32 at `sample_rate`. Chunk times are relative to `start_secs`.
    fn open_audio(
        &self,
        path: &Path,
        start_secs: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> ExportResult<Box<dyn AudioReader>>;

    /// Decode a still image as RGBA.
    fn load_image(&self, path: &Path) -> ExportResult<PixelBuffer>;

    fn create_writer(&self, config: &OutputConfig) -> ExportResult<WriterHandles>;
}
