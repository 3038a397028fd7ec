//! Export jobs: from a recording and its editor state to a finished file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reel_common::clock::{total_frames, ExportClock};
use reel_common::config::ExportDefaults;
use reel_common::error::{ExportError, ExportResult};
use reel_processing_core::{
    CursorLookup, CursorMetadataProvider, CursorMetadataSnapshot, ZoomDetector, ZoomDetectorConfig,
};
use reel_project_model::editor::{EditorState, TimeRange};
use reel_project_model::recording::RecordingResult;
use reel_project_model::style::BackgroundStyle;
use reel_project_model::zoom::ZoomTimeline;

use crate::audio::{AudioSource, TrackAssembler, OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};
use crate::cancel::CancelToken;
use crate::frame::PixelBuffer;
use crate::instruction::{CompositionInstruction, InstructionInputs};
use crate::media::{AudioOutput, AudioReader, MediaBackend, OutputConfig};
use crate::pipeline::{ParallelExportPipeline, PipelineConfig, PipelineSources, PipelineStats};
use crate::progress::{report, ExportProgress, ExportStage, ProgressCallback};

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// The recording's media, with absolute paths.
    pub recording: RecordingResult,

    /// Editor configuration, including output settings.
    pub editor: EditorState,

    /// Output file path.
    pub output_path: PathBuf,

    /// Pipeline tuning.
    pub config: ExportDefaults,
}

impl ExportJob {
    pub fn new(recording: RecordingResult, editor: EditorState, output_path: impl Into<PathBuf>) -> Self {
        Self {
            recording,
            editor,
            output_path: output_path.into(),
            config: ExportDefaults::default(),
        }
    }

    pub fn with_config(mut self, config: ExportDefaults) -> Self {
        self.config = config;
        self
    }
}

/// What a successful export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_secs: f64,
    pub frames_written: u64,
    pub has_audio: bool,
    pub elapsed_secs: f64,
    pub stats: PipelineStats,
}

/// Export the recording to a video file. Blocks until done.
///
/// This is the main entry point for rendering. Cancelling `cancel` from
/// another thread stops the export with [`ExportError::Cancelled`] and
/// leaves nothing at the output path.
pub fn export_recording(
    job: &ExportJob,
    backend: &dyn MediaBackend,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> ExportResult<ExportSummary> {
    let clock = ExportClock::start();
    let settings = job.editor.export;
    tracing::info!(
        output = %job.output_path.display(),
        backend = backend.name(),
        codec = ?settings.codec,
        resolution = ?settings.resolution,
        "Starting export"
    );
    report(progress.as_ref(), ExportProgress::stage(ExportStage::Preparing, 0));
    cancel.check()?;

    let recording = &job.recording;
    let screen_info = backend.probe(&recording.screen_video)?;
    let screen_video = screen_info
        .video
        .ok_or_else(|| ExportError::source_track_missing("screen video"))?;

    let trim = job.editor.effective_trim(screen_info.duration_secs);
    if trim.duration() <= 0.0 {
        return Err(ExportError::invalid(format!(
            "nothing to export: source duration is {:.3}s",
            screen_info.duration_secs
        )));
    }
    let capture_fps = if recording.fps > 0.0 {
        recording.fps
    } else {
        screen_video.fps
    };
    let fps = settings.fps.value(capture_fps);
    let frame_count = total_frames(trim.duration(), fps);

    let cursor = load_cursor(recording, &job.editor);
    let zoom_timeline = build_zoom_timeline(
        &job.editor,
        cursor.as_ref().map(|(provider, _)| provider),
        screen_info.duration_secs,
    );
    let background_image = load_background_image(backend, recording, &job.editor.background_style);

    let instruction = CompositionInstruction::build(
        recording,
        &job.editor,
        InstructionInputs {
            trim: Some(trim),
            cursor_snapshot: cursor.map(|(_, snapshot)| snapshot),
            zoom_timeline: Some(zoom_timeline),
            background_image: background_image.as_ref(),
        },
    )?;
    drop(background_image);
    cancel.check()?;

    let screen = backend.open_video(&recording.screen_video, trim.start_secs, trim.duration())?;
    let webcam = match (&instruction.camera, &recording.webcam_video) {
        (Some(_), Some(path)) => Some(backend.open_video(path, trim.start_secs, trim.duration())?),
        _ => None,
    };
    let audio_sources = open_audio_sources(backend, recording, &job.editor, &trim)?;
    let has_audio = !audio_sources.is_empty();
    let audio: Option<Box<dyn AudioReader>> = has_audio
        .then(|| Box::new(TrackAssembler::new(audio_sources, trim.duration())) as Box<dyn AudioReader>);

    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let (width, height) = (instruction.render_width, instruction.render_height);
    let output = OutputConfig {
        destination: job.output_path.clone(),
        width,
        height,
        fps,
        codec: settings.codec,
        format: settings.effective_format(),
        video_bitrate: settings.codec.target_bitrate(width, height, fps),
        audio: has_audio.then_some(AudioOutput {
            sample_rate: OUTPUT_SAMPLE_RATE,
            channels: OUTPUT_CHANNELS,
            bitrate_kbps: settings.audio_bitrate_kbps,
        }),
    };
    let writer = backend.create_writer(&output)?;

    tracing::info!(
        width,
        height,
        fps,
        total_frames = frame_count,
        trim_start = trim.start_secs,
        trim_end = trim.end_secs,
        has_webcam = webcam.is_some(),
        has_audio,
        "Export plan ready"
    );

    let pipeline = ParallelExportPipeline::new(PipelineConfig::from_defaults(
        &job.config,
        fps,
        frame_count,
        width,
        height,
    ));
    let stats = pipeline.run(
        &instruction,
        PipelineSources {
            screen,
            webcam,
            audio,
        },
        writer,
        &job.output_path,
        progress,
        cancel,
    )?;

    let summary = ExportSummary {
        output_path: job.output_path.clone(),
        width,
        height,
        fps,
        duration_secs: trim.duration(),
        frames_written: stats.frames_written,
        has_audio,
        elapsed_secs: clock.elapsed_secs(),
        stats,
    };
    tracing::info!(
        output = %summary.output_path.display(),
        frames = summary.frames_written,
        elapsed_secs = summary.elapsed_secs,
        "Export complete"
    );
    Ok(summary)
}

/// [`export_recording`] on tokio's blocking pool.
pub async fn export_recording_async(
    job: ExportJob,
    backend: Arc<dyn MediaBackend>,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
) -> ExportResult<ExportSummary> {
    tokio::task::spawn_blocking(move || export_recording(&job, backend.as_ref(), progress, &cancel))
        .await
        .map_err(|e| ExportError::encode(format!("export task failed: {e}")))?
}

/// Cursor data is optional: a missing or unreadable file exports without
/// cursor overlays, click highlights, or auto zoom.
fn load_cursor(
    recording: &RecordingResult,
    editor: &EditorState,
) -> Option<(CursorMetadataProvider, Arc<CursorMetadataSnapshot>)> {
    let path = recording.cursor_metadata.as_ref()?;
    match CursorMetadataProvider::load(path) {
        Ok(provider) => {
            let snapshot = provider.make_snapshot(
                editor.cursor_movement_speed,
                CursorLookup::from_editor(editor.cursor_lookup, editor.cursor_smoothing),
            );
            Some((provider, snapshot))
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Ignoring cursor metadata");
            None
        }
    }
}

/// Manual keyframes, plus detected ones when auto zoom is on.
fn build_zoom_timeline(
    editor: &EditorState,
    cursor: Option<&CursorMetadataProvider>,
    source_duration: f64,
) -> ZoomTimeline {
    let detected = match cursor {
        Some(provider) if editor.auto_zoom_enabled => {
            let detector = ZoomDetector::new(ZoomDetectorConfig::from(&editor.auto_zoom));
            let keyframes = detector.detect(provider.metadata(), source_duration);
            tracing::debug!(keyframes = keyframes.len(), "Auto zoom detected");
            keyframes
        }
        _ => Vec::new(),
    };
    ZoomTimeline::merge(&editor.zoom_keyframes, &detected)
}

/// Image backgrounds resolve relative to the recording's directory.
fn background_image_path(recording: &RecordingResult, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    recording
        .screen_video
        .parent()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}

fn load_background_image(
    backend: &dyn MediaBackend,
    recording: &RecordingResult,
    style: &BackgroundStyle,
) -> Option<PixelBuffer> {
    let BackgroundStyle::Image { filename } = style else {
        return None;
    };
    let path = background_image_path(recording, filename);
    match backend.load_image(&path) {
        Ok(image) => Some(image),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Background image unavailable");
            None
        }
    }
}

fn open_audio_sources(
    backend: &dyn MediaBackend,
    recording: &RecordingResult,
    editor: &EditorState,
    trim: &TimeRange,
) -> ExportResult<Vec<AudioSource>> {
    let tracks = [
        (
            "system",
            &recording.system_audio,
            &editor.system_audio_regions,
            editor.system_audio_volume,
        ),
        (
            "microphone",
            &recording.microphone_audio,
            &editor.microphone_audio_regions,
            editor.microphone_volume,
        ),
    ];
    let mut sources = Vec::new();
    for (name, path, regions, volume) in tracks {
        let Some(path) = path else {
            continue;
        };
        if volume <= 0.0 {
            tracing::debug!(track = name, "Skipping muted audio track");
            continue;
        }
        let reader = backend.open_audio(path, trim.start_secs, trim.duration(), OUTPUT_SAMPLE_RATE)?;
        let regions = regions
            .as_ref()
            .map(|r| TimeRange::relative_to(r, trim));
        sources.push(
            AudioSource::new(name, reader)
                .with_regions(regions)
                .with_volume(volume),
        );
    }
    Ok(sources)
}
