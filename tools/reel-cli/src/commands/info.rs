//! Show recording information.

use std::path::{Path, PathBuf};

use reel_common::config::AppConfig;
use reel_processing_core::CursorMetadataProvider;
use reel_project_model::recording::RecordingResult;
use reel_render_engine::{FfmpegBackend, MediaBackend, MediaInfo};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TrackReport {
    role: &'static str,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecordingReport {
    screen_width: f64,
    screen_height: f64,
    fps: f64,
    recorded_at: Option<String>,
    tracks: Vec<TrackReport>,
    cursor_samples: Option<usize>,
    cursor_clicks: Option<usize>,
}

pub fn run(config: &AppConfig, path: PathBuf, json: bool) -> anyhow::Result<()> {
    let recording = RecordingResult::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load recording: {e}"))?;

    let backend = FfmpegBackend::from_config(&config.export);
    let can_probe = backend.is_available();
    let probe = |role: &'static str, path: &Path| {
        let (media, error) = if !can_probe {
            (None, Some("ffprobe not available".to_string()))
        } else {
            match backend.probe(path) {
                Ok(info) => (Some(info), None),
                Err(e) => (None, Some(e.to_string())),
            }
        };
        TrackReport {
            role,
            path: path.to_path_buf(),
            media,
            error,
        }
    };

    let mut tracks = vec![probe("screen", &recording.screen_video)];
    for (role, track) in [
        ("webcam", &recording.webcam_video),
        ("system audio", &recording.system_audio),
        ("microphone", &recording.microphone_audio),
    ] {
        if let Some(track) = track {
            tracks.push(probe(role, track));
        }
    }

    let cursor = recording
        .cursor_metadata
        .as_ref()
        .and_then(|p| CursorMetadataProvider::load(p).ok());

    let report = RecordingReport {
        screen_width: recording.screen_size.width,
        screen_height: recording.screen_size.height,
        fps: recording.fps,
        recorded_at: recording.recorded_at.clone(),
        tracks,
        cursor_samples: cursor.as_ref().map(|c| c.metadata().samples.len()),
        cursor_clicks: cursor.as_ref().map(|c| c.metadata().clicks.len()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Recording: {}", path.display());
    println!(
        "  Screen: {}x{} @ {}fps",
        report.screen_width, report.screen_height, report.fps
    );
    if let Some(at) = &report.recorded_at {
        println!("  Recorded: {at}");
    }
    println!();

    println!("Tracks:");
    for track in &report.tracks {
        match (&track.media, &track.error) {
            (Some(info), _) => {
                let mut details = vec![format!("{:.1}s", info.duration_secs)];
                if let Some(v) = &info.video {
                    details.push(format!("{} {}x{} @ {:.2}fps", v.codec, v.width, v.height, v.fps));
                }
                if let Some(a) = &info.audio {
                    details.push(format!("{} {}Hz {}ch", a.codec, a.sample_rate, a.channels));
                }
                println!("  {}: {} ({})", track.role, track.path.display(), details.join(", "));
            }
            (None, Some(err)) => {
                println!("  {}: {} [{err}]", track.role, track.path.display());
            }
            (None, None) => println!("  {}: {}", track.role, track.path.display()),
        }
    }
    println!();

    match (report.cursor_samples, report.cursor_clicks) {
        (Some(samples), Some(clicks)) => {
            println!("Cursor metadata: {samples} samples, {clicks} clicks")
        }
        _ if recording.cursor_metadata.is_some() => println!("Cursor metadata: unreadable"),
        _ => println!("Cursor metadata: none"),
    }

    Ok(())
}
