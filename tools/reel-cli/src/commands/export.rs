//! Export a recording to video.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reel_common::config::AppConfig;
use reel_project_model::editor::EditorState;
use reel_project_model::export::{ContainerFormat, ExportFps, ExportResolution, VideoCodec};
use reel_project_model::recording::RecordingResult;
use reel_render_engine::{
    export_recording_async, CancelToken, ExportJob, ExportProgress, ExportStage, FfmpegBackend,
    MediaBackend, ProgressCallback,
};

/// Output settings given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub codec: Option<String>,
    pub fps: Option<String>,
    pub resolution: Option<String>,
    pub format: Option<String>,
}

impl Overrides {
    fn apply(&self, editor: &mut EditorState) -> anyhow::Result<()> {
        if let Some(codec) = &self.codec {
            editor.export.codec = VideoCodec::parse(codec)
                .ok_or_else(|| anyhow::anyhow!("Unknown codec: {codec}. Use: h264, h265, prores"))?;
        }
        if let Some(fps) = &self.fps {
            editor.export.fps = ExportFps::parse(fps)
                .ok_or_else(|| anyhow::anyhow!("Unknown fps: {fps}. Use: original, 24, 30, 60"))?;
        }
        if let Some(resolution) = &self.resolution {
            editor.export.resolution = ExportResolution::parse(resolution).ok_or_else(|| {
                anyhow::anyhow!("Unknown resolution: {resolution}. Use: original, 720p, 1080p, 1440p, 4k")
            })?;
        }
        if let Some(format) = &self.format {
            editor.export.format = ContainerFormat::parse(format)
                .ok_or_else(|| anyhow::anyhow!("Unknown format: {format}. Use: mp4, mov"))?;
        }
        Ok(())
    }
}

pub async fn run(
    config: &AppConfig,
    recording_path: PathBuf,
    editor_path: Option<PathBuf>,
    output: Option<PathBuf>,
    overrides: Overrides,
) -> anyhow::Result<()> {
    println!("Exporting recording: {}", recording_path.display());

    let recording = RecordingResult::load(&recording_path)
        .map_err(|e| anyhow::anyhow!("Failed to load recording: {e}"))?;

    let mut editor = match &editor_path {
        Some(path) => {
            EditorState::load(path).map_err(|e| anyhow::anyhow!("Failed to load editor state: {e}"))?
        }
        None => {
            let mut editor = EditorState::default();
            if let Some(codec) = VideoCodec::parse(&config.export.video_codec) {
                editor.export.codec = codec;
            }
            editor.export.audio_bitrate_kbps = config.export.audio_bitrate_kbps;
            editor
        }
    };
    overrides.apply(&mut editor)?;

    let output_path = output.unwrap_or_else(|| default_output(&recording_path, &editor));

    let backend = Arc::new(FfmpegBackend::from_config(&config.export));
    if !backend.is_available() {
        return Err(anyhow::anyhow!(
            "No supported media backend found (expected ffmpeg and ffprobe in PATH)"
        ));
    }

    println!("  Output: {}", output_path.display());
    println!("  Codec: {:?}", editor.export.codec);
    println!("  Resolution: {:?}", editor.export.resolution);
    println!("  FPS: {:?}", editor.export.fps);

    let job = ExportJob::new(recording, editor, output_path.clone()).with_config(config.export.clone());
    let progress_cb: ProgressCallback = Arc::new(print_progress);
    let cancel = CancelToken::new();

    let mut task = tokio::spawn(export_recording_async(
        job,
        backend,
        Some(progress_cb),
        cancel.clone(),
    ));
    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            println!("\n  Cancelling...");
            cancel.cancel();
            task.await
        }
    };
    let result = joined.map_err(|e| anyhow::anyhow!("Export task failed: {e}"))?;

    match result {
        Ok(summary) => {
            println!(
                "\nExport complete: {} ({}x{}, {} frames in {:.1}s)",
                summary.output_path.display(),
                summary.width,
                summary.height,
                summary.frames_written,
                summary.elapsed_secs
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("\nExport cancelled.");
            Ok(())
        }
        Err(e) => {
            println!("\nExport failed: {e}");
            Err(e.into())
        }
    }
}

fn print_progress(p: ExportProgress) {
    match p.stage {
        ExportStage::Rendering | ExportStage::Draining => {
            let eta = p
                .eta_secs
                .map(|s| format!("{s:.0}s"))
                .unwrap_or_else(|| "--".to_string());
            print!(
                "\r  Progress: {:.1}% ({}/{} frames, ETA: {eta})  ",
                p.fraction * 100.0,
                p.frames_written,
                p.total_frames,
            );
        }
        stage => print!("\r  {:<40}", format!("Stage: {}", stage.label())),
    }
    let _ = std::io::stdout().flush();
}

/// `export.<ext>` next to the recording manifest.
fn default_output(recording_path: &Path, editor: &EditorState) -> PathBuf {
    let name = format!("export.{}", editor.export.effective_format().extension());
    recording_path
        .parent()
        .map(|dir| dir.join(&name))
        .unwrap_or_else(|| PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut editor = EditorState::default();
        Overrides {
            codec: Some("prores".to_string()),
            fps: Some("60".to_string()),
            resolution: Some("1080p".to_string()),
            format: None,
        }
        .apply(&mut editor)
        .unwrap();
        assert_eq!(editor.export.codec, VideoCodec::ProRes);
        assert_eq!(editor.export.fps, ExportFps::Fps60);
        assert_eq!(editor.export.resolution, ExportResolution::P1080);
        assert_eq!(
            default_output(Path::new("/rec/recording.json"), &editor),
            PathBuf::from("/rec/export.mov")
        );
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let mut editor = EditorState::default();
        let err = Overrides {
            format: Some("avi".to_string()),
            ..Overrides::default()
        }
        .apply(&mut editor)
        .unwrap_err();
        assert!(err.to_string().contains("Unknown format"));
    }
}
