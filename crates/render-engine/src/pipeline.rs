//! Parallel export pipeline.
//!
//! ```text
//! screen decoder ──┐                          ┌── render worker ──┐
//!                  ├── dispatcher (caller) ───┼── render worker ──┼── OrderedFrameWriter ── FrameSink
//! webcam decoder ──┘   slot + pool buffer     └── render worker ──┘
//!
//! audio reader ────────── audio pump thread ──────────────────────────────── AudioSink
//! ```
//!
//! The dispatcher walks output frame indices in order, carries the latest
//! decoded frame of each source forward to the target time, takes a
//! backpressure slot and a pool buffer, and spawns a render task. Slots are
//! released only once the writer appended (or discarded) the frame, so at
//! most `max_in_flight` frames exist between dispatch and encoder.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use reel_common::clock::frame_time;
use reel_common::config::ExportDefaults;
use reel_common::error::{ExportError, ExportResult};

use crate::backpressure::FrameSlots;
use crate::cancel::CancelToken;
use crate::compositor::render_frame;
use crate::frame::PixelBuffer;
use crate::instruction::{CompositionInstruction, TrackId};
use crate::media::{AudioReader, AudioSink, DecodedFrame, VideoDecoder, WriterHandles};
use crate::pool::BufferPool;
use crate::progress::{report, ExportProgress, ExportStage, ProgressCallback};
use crate::writer::{OrderedFrameWriter, RenderedFrame, WriterSummary};

/// A source frame at `pts` serves every output tick up to `pts + PTS_SLACK`.
const PTS_SLACK: f64 = 0.001;

/// Extra pool buffers beyond the slot count.
const POOL_HEADROOM: usize = 4;

/// Sizing and scheduling for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub fps: f64,
    pub total_frames: u64,
    pub render_width: u32,
    pub render_height: u32,
    /// Backpressure slots: frames between dispatch and encoder append.
    pub max_in_flight: usize,
    pub pool_capacity: usize,
    /// Render worker threads (0 = one per core).
    pub render_threads: usize,
    pub progress_interval: u64,
}

impl PipelineConfig {
    /// Size the pipeline for a `width` x `height` export from `defaults`.
    pub fn from_defaults(
        defaults: &ExportDefaults,
        fps: f64,
        total_frames: u64,
        width: u32,
        height: u32,
    ) -> Self {
        let max_in_flight = Self::max_in_flight_for(
            num_cpus::get(),
            defaults.memory_budget_bytes,
            PixelBuffer::bytes_for(width, height) as u64,
            defaults.max_in_flight_cap,
        );
        Self {
            fps,
            total_frames,
            render_width: width,
            render_height: height,
            max_in_flight,
            pool_capacity: max_in_flight + POOL_HEADROOM,
            render_threads: defaults.render_threads,
            progress_interval: defaults.progress_interval_frames,
        }
    }

    /// `max(cores * 4, min(budget / bytes_per_frame, cap))`, at least 1.
    pub fn max_in_flight_for(
        cores: usize,
        memory_budget_bytes: u64,
        bytes_per_frame: u64,
        cap: usize,
    ) -> usize {
        let by_memory = (memory_budget_bytes / bytes_per_frame.max(1)).min(cap as u64) as usize;
        (cores * 4).max(by_memory).max(1)
    }

    fn validate(&self) -> ExportResult<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ExportError::invalid(format!("fps must be positive, got {}", self.fps)));
        }
        if self.total_frames == 0 {
            return Err(ExportError::invalid("nothing to export: zero frames"));
        }
        if self.render_width == 0 || self.render_height == 0 {
            return Err(ExportError::invalid("render size is empty"));
        }
        if self.pool_capacity < self.max_in_flight {
            return Err(ExportError::invalid(
                "buffer pool must hold at least max_in_flight frames",
            ));
        }
        Ok(())
    }
}

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Cancelled | PipelineState::Failed
        )
    }
}

/// Resource accounting for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Distinct pixel buffers the pool had to allocate.
    pub buffers_allocated: usize,
    pub buffers_acquired: u64,
    pub buffers_released: u64,
    pub slots_acquired: u64,
    pub slots_released: u64,
    pub frames_submitted: u64,
    pub frames_written: u64,
    pub frames_dropped: u64,
    pub peak_in_flight: usize,
}

#[derive(Debug)]
struct MonitorInner {
    state: Mutex<PipelineState>,
    stats: Mutex<PipelineStats>,
}

/// Cloneable view of a pipeline's state and last stats.
#[derive(Debug, Clone)]
pub struct PipelineMonitor {
    inner: Arc<MonitorInner>,
}

impl PipelineMonitor {
    fn new() -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                state: Mutex::new(PipelineState::Idle),
                stats: Mutex::new(PipelineStats::default()),
            }),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> PipelineStats {
        *self.inner.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: PipelineState) {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            tracing::info!(from = ?*state, to = ?next, "Pipeline state");
            *state = next;
        }
    }

    fn set_stats(&self, stats: PipelineStats) {
        *self.inner.stats.lock().unwrap_or_else(|e| e.into_inner()) = stats;
    }
}

/// Decoded inputs for one run.
pub struct PipelineSources {
    pub screen: Box<dyn VideoDecoder>,
    pub webcam: Option<Box<dyn VideoDecoder>>,
    /// Already mixed and trimmed.
    pub audio: Option<Box<dyn AudioReader>>,
}

/// Drives decode, render, and encode for one export.
pub struct ParallelExportPipeline {
    config: PipelineConfig,
    monitor: PipelineMonitor,
}

impl ParallelExportPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            monitor: PipelineMonitor::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn monitor(&self) -> PipelineMonitor {
        self.monitor.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.monitor.state()
    }

    /// Stats of the most recent run, whatever its outcome.
    pub fn stats(&self) -> PipelineStats {
        self.monitor.stats()
    }

    /// Run the export to completion.
    ///
    /// On any failure or cancellation the container is aborted and
    /// `destination` removed before the error is returned.
    pub fn run(
        &self,
        instruction: &CompositionInstruction,
        sources: PipelineSources,
        writer: WriterHandles,
        destination: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ExportResult<PipelineStats> {
        let WriterHandles {
            video,
            audio: audio_sink,
            container,
        } = writer;

        let prepared = self.config.validate().and_then(|()| {
            if (instruction.render_width, instruction.render_height)
                != (self.config.render_width, self.config.render_height)
            {
                return Err(ExportError::invalid("render size differs from the instruction"));
            }
            if sources.audio.is_some() && audio_sink.is_none() {
                return Err(ExportError::invalid(
                    "audio source given but writer has no audio track",
                ));
            }
            let pool = BufferPool::new(
                self.config.pool_capacity,
                self.config.render_width,
                self.config.render_height,
            )?;
            let slots = FrameSlots::new(self.config.max_in_flight)?;
            let threads = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.render_threads)
                .thread_name(|i| format!("reel-render-{i}"))
                .build()
                .map_err(|e| ExportError::exhausted(format!("render thread pool: {e}")))?;
            Ok((pool, slots, threads))
        });
        let (pool, slots, threads) = match prepared {
            Ok(parts) => parts,
            Err(err) => {
                container.abort();
                remove_partial_output(destination);
                self.monitor.set_state(PipelineState::Failed);
                return Err(err);
            }
        };

        tracing::info!(
            total_frames = self.config.total_frames,
            fps = self.config.fps,
            width = self.config.render_width,
            height = self.config.render_height,
            max_in_flight = self.config.max_in_flight,
            render_threads = threads.current_num_threads(),
            has_webcam = sources.webcam.is_some(),
            has_audio = sources.audio.is_some(),
            "Starting export pipeline"
        );
        self.monitor.set_state(PipelineState::Running);
        report(
            progress.as_ref(),
            ExportProgress::stage(ExportStage::Rendering, self.config.total_frames),
        );

        // Internal stop: set by the caller's cancel or by any failure.
        let stop = cancel.child();
        let submitted = AtomicU64::new(0);
        let writer = OrderedFrameWriter::new(
            video,
            self.config.total_frames,
            progress.clone(),
            self.config.progress_interval,
            stop.clone(),
        );

        let PipelineSources {
            screen,
            webcam,
            audio,
        } = sources;

        let (video_result, audio_result) = std::thread::scope(|s| {
            let audio_task = match (audio, audio_sink) {
                (Some(reader), Some(sink)) => {
                    let stop = &stop;
                    Some(s.spawn(move || {
                        let result = pump_audio(reader, sink, stop);
                        if let Err(err) = &result {
                            if !err.is_cancelled() {
                                tracing::error!(error = %err, "Audio track failed");
                                stop.cancel();
                            }
                        }
                        result
                    }))
                }
                (None, Some(mut sink)) => {
                    // Writer expects audio but there is none: close the track.
                    if let Err(err) = sink.finish() {
                        tracing::warn!(error = %err, "Failed to close empty audio track");
                    }
                    None
                }
                // A reader without a sink was rejected above.
                (_, None) => None,
            };

            let mut screen = FrameCursor::new(TrackId::Screen, screen);
            let mut webcam = webcam.map(|d| FrameCursor::new(TrackId::Webcam, d));
            let dispatched: ExportResult<()> = threads.in_place_scope(|scope| {
                let ctx = RenderContext {
                    instruction,
                    writer: &writer,
                    stop: &stop,
                };
                for index in 0..self.config.total_frames {
                    stop.check()?;
                    if writer.is_stopped() {
                        break;
                    }
                    let t = frame_time(index, self.config.fps);
                    let screen_image = screen
                        .frame_at(t)?
                        .ok_or_else(|| ExportError::source_track_missing(TrackId::Screen.as_str()))?;
                    let webcam_image = match webcam.as_mut() {
                        Some(cursor) => cursor.frame_at(t)?,
                        None => None,
                    };
                    let permit = slots.acquire(&stop)?;
                    let buffer = pool.acquire(&stop)?;
                    submitted.fetch_add(1, Ordering::SeqCst);
                    scope.spawn(move |_| {
                        let mut buffer = buffer;
                        match render_frame(
                            &screen_image,
                            webcam_image.as_deref(),
                            t,
                            ctx.instruction,
                            &mut buffer,
                        ) {
                            Ok(()) => ctx.writer.submit(RenderedFrame {
                                index,
                                pts_secs: t,
                                buffer,
                                permit,
                            }),
                            Err(err) => {
                                tracing::error!(index, error = %err, "Frame render failed");
                                ctx.writer.fail(err);
                                ctx.stop.cancel();
                            }
                        }
                    });
                }
                Ok(())
            });

            match dispatched {
                Ok(()) => writer.finish(),
                Err(err) if err.is_cancelled() => writer.cancel(),
                Err(err) => {
                    tracing::error!(error = %err, "Frame dispatch failed");
                    writer.fail(err);
                    stop.cancel();
                }
            }
            self.monitor.set_state(PipelineState::Draining);
            let written = writer.frames_written();
            report(
                progress.as_ref(),
                ExportProgress {
                    fraction: written as f64 / self.config.total_frames as f64 * 0.99,
                    frames_written: written,
                    ..ExportProgress::stage(ExportStage::Draining, self.config.total_frames)
                },
            );

            let video_result = writer.wait_until_done();
            if video_result.is_err() {
                stop.cancel();
            }
            let audio_result = match audio_task {
                Some(task) => task
                    .join()
                    .unwrap_or_else(|_| Err(ExportError::encode("audio thread panicked"))),
                None => Ok(()),
            };
            (video_result, audio_result)
        });

        let frames_written = writer.frames_written();
        let frames_dropped = writer.frames_dropped();
        let mut video_sink = writer.into_sink();
        let stats = PipelineStats {
            buffers_allocated: pool.allocated(),
            buffers_acquired: pool.acquired_count(),
            buffers_released: pool.released_count(),
            slots_acquired: slots.acquired_count(),
            slots_released: slots.released_count(),
            frames_submitted: submitted.load(Ordering::SeqCst),
            frames_written,
            frames_dropped,
            peak_in_flight: slots.peak_in_flight(),
        };

        if let Err(err) = classify(cancel, video_result, audio_result) {
            drop(video_sink);
            container.abort();
            remove_partial_output(destination);
            self.finish_with_error(&err, stats);
            return Err(err);
        }

        self.monitor.set_state(PipelineState::Finalizing);
        report(
            progress.as_ref(),
            ExportProgress {
                fraction: 0.99,
                frames_written,
                ..ExportProgress::stage(ExportStage::Finalizing, self.config.total_frames)
            },
        );
        let finalized = match video_sink.finish().and_then(|()| cancel.check()) {
            Ok(()) => {
                drop(video_sink);
                container.finalize(cancel)
            }
            Err(err) => {
                drop(video_sink);
                container.abort();
                Err(err)
            }
        };
        // A cancel that lands while the file is moved into place still wins.
        let finalized = match finalized {
            _ if cancel.is_cancelled() => Err(ExportError::Cancelled),
            other => other,
        };
        match finalized {
            Ok(()) => {
                self.monitor.set_stats(stats);
                self.monitor.set_state(PipelineState::Completed);
                report(
                    progress.as_ref(),
                    ExportProgress::complete(self.config.total_frames),
                );
                tracing::info!(
                    frames = frames_written,
                    output = %destination.display(),
                    "Export pipeline completed"
                );
                Ok(stats)
            }
            Err(err) => {
                remove_partial_output(destination);
                self.finish_with_error(&err, stats);
                Err(err)
            }
        }
    }

    fn finish_with_error(&self, err: &ExportError, stats: PipelineStats) {
        self.monitor.set_stats(stats);
        if err.is_cancelled() {
            tracing::info!(frames_written = stats.frames_written, "Export cancelled");
            self.monitor.set_state(PipelineState::Cancelled);
        } else {
            tracing::error!(error = %err, "Export pipeline failed");
            self.monitor.set_state(PipelineState::Failed);
        }
    }
}

/// Shared, borrowed state handed to each render task.
#[derive(Clone, Copy)]
struct RenderContext<'a> {
    instruction: &'a CompositionInstruction,
    writer: &'a OrderedFrameWriter,
    stop: &'a CancelToken,
}

/// Caller cancellation wins; otherwise the first real failure.
fn classify(
    cancel: &CancelToken,
    video: ExportResult<WriterSummary>,
    audio: ExportResult<()>,
) -> ExportResult<WriterSummary> {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    match (video, audio) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Err(v), Err(a)) if v.is_cancelled() => Err(a),
        (Err(v), _) => Err(v),
        (Ok(_), Err(a)) => Err(a),
    }
}

fn pump_audio(
    mut reader: Box<dyn AudioReader>,
    mut sink: Box<dyn AudioSink>,
    stop: &CancelToken,
) -> ExportResult<()> {
    let mut chunks = 0u64;
    while let Some(chunk) = reader.next_chunk()? {
        stop.check()?;
        sink.append(&chunk)?;
        chunks += 1;
    }
    sink.finish()?;
    tracing::debug!(chunks, "Audio track complete");
    Ok(())
}

/// Remove a partially written destination, if any.
fn remove_partial_output(destination: &Path) {
    match std::fs::remove_file(destination) {
        Ok(()) => tracing::debug!(path = %destination.display(), "Removed partial output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %destination.display(), error = %err, "Failed to remove partial output")
        }
    }
}

/// Tracks the latest decoded frame at or before each output tick.
struct FrameCursor {
    track: TrackId,
    decoder: Box<dyn VideoDecoder>,
    current: Option<DecodedFrame>,
    lookahead: Option<DecodedFrame>,
    ended: bool,
}

impl FrameCursor {
    fn new(track: TrackId, decoder: Box<dyn VideoDecoder>) -> Self {
        Self {
            track,
            decoder,
            current: None,
            lookahead: None,
            ended: false,
        }
    }

    /// The frame to show at `t`. Frames are carried forward across ticks
    /// with no new source frame; the first frame is used even when it
    /// starts after `t`.
    fn frame_at(&mut self, t: f64) -> ExportResult<Option<Arc<PixelBuffer>>> {
        loop {
            if self.lookahead.is_none() && !self.ended {
                self.lookahead = self.decoder.next_frame()?;
                if self.lookahead.is_none() {
                    self.ended = true;
                    tracing::debug!(track = self.track.as_str(), t, "Source stream ended");
                }
            }
            let take = match &self.lookahead {
                Some(next) => self.current.is_none() || next.pts_secs <= t + PTS_SLACK,
                None => false,
            };
            if !take {
                break;
            }
            self.current = self.lookahead.take();
        }
        Ok(self.current.as_ref().map(|f| f.image.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ListDecoder(VecDeque<f64>);

    impl VideoDecoder for ListDecoder {
        fn next_frame(&mut self) -> ExportResult<Option<DecodedFrame>> {
            Ok(self.0.pop_front().map(|pts| DecodedFrame {
                pts_secs: pts,
                image: Arc::new(PixelBuffer::filled(1, 1, [(pts * 10.0) as u8, 0, 0, 255])),
            }))
        }
    }

    fn cursor(pts: &[f64]) -> FrameCursor {
        FrameCursor::new(TrackId::Screen, Box::new(ListDecoder(pts.iter().copied().collect())))
    }

    fn red(frame: Option<Arc<PixelBuffer>>) -> u8 {
        frame.map(|f| f.pixel(0, 0)[0]).unwrap_or(255)
    }

    #[test]
    fn test_cursor_carries_frames_forward() {
        let mut c = cursor(&[0.0, 1.0, 2.0]);
        assert_eq!(red(c.frame_at(0.0).unwrap()), 0);
        assert_eq!(red(c.frame_at(0.5).unwrap()), 0);
        assert_eq!(red(c.frame_at(1.0).unwrap()), 10);
        assert_eq!(red(c.frame_at(5.0).unwrap()), 20);
    }

    #[test]
    fn test_cursor_skips_to_latest_at_or_before() {
        let mut c = cursor(&[0.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(red(c.frame_at(0.25).unwrap()), 2);
    }

    #[test]
    fn test_cursor_uses_late_first_frame() {
        let mut c = cursor(&[0.5]);
        assert_eq!(red(c.frame_at(0.0).unwrap()), 5);
    }

    #[test]
    fn test_empty_cursor_yields_none() {
        let mut c = cursor(&[]);
        assert!(c.frame_at(0.0).unwrap().is_none());
    }

    #[test]
    fn test_max_in_flight_formula() {
        // 1080p RGBA is ~8.3 MB a frame.
        let frame = PixelBuffer::bytes_for(1920, 1080) as u64;
        assert_eq!(PipelineConfig::max_in_flight_for(8, 1_500_000_000, frame, 120), 120);
        assert_eq!(PipelineConfig::max_in_flight_for(64, 1_500_000_000, frame, 120), 256);
        assert_eq!(PipelineConfig::max_in_flight_for(2, 50_000_000, frame, 120), 8);
    }

    #[test]
    fn test_config_validation() {
        let defaults = ExportDefaults::default();
        let ok = PipelineConfig::from_defaults(&defaults, 30.0, 10, 64, 36);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.pool_capacity, ok.max_in_flight + POOL_HEADROOM);

        let zero = PipelineConfig {
            total_frames: 0,
            ..ok.clone()
        };
        assert!(zero.validate().is_err());
        let bad_fps = PipelineConfig { fps: 0.0, ..ok };
        assert!(bad_fps.validate().is_err());
    }

    #[test]
    fn test_cancel_beats_failure_in_classification() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = classify(&cancel, Err(ExportError::encode("boom")), Ok(()));
        assert!(result.unwrap_err().is_cancelled());

        let fresh = CancelToken::new();
        let result = classify(
            &fresh,
            Err(ExportError::Cancelled),
            Err(ExportError::decode("system", "truncated")),
        );
        assert!(matches!(result, Err(ExportError::DecodeFailed { .. })));
    }
}
