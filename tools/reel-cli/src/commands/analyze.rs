//! Detect zoom regions from recorded clicks.

use std::path::PathBuf;

use reel_common::config::AppConfig;
use reel_processing_core::{CursorMetadataProvider, ZoomDetector, ZoomDetectorConfig};
use reel_project_model::editor::EditorState;

pub fn run(
    config: &AppConfig,
    cursor_path: PathBuf,
    duration: f64,
    zoom_level: Option<f64>,
    dwell: Option<f64>,
    transition: Option<f64>,
    write_editor: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Analyzing cursor metadata: {}", cursor_path.display());

    if !(duration.is_finite() && duration > 0.0) {
        return Err(anyhow::anyhow!("Duration must be positive, got {duration}"));
    }

    let provider = CursorMetadataProvider::load(&cursor_path)
        .map_err(|e| anyhow::anyhow!("Failed to load cursor metadata: {e}"))?;
    let metadata = provider.metadata();
    println!(
        "  Loaded {} samples, {} clicks ({}x{} capture area)",
        metadata.samples.len(),
        metadata.clicks.len(),
        metadata.capture_area_width,
        metadata.capture_area_height
    );

    if metadata.clicks.is_empty() {
        println!("  No clicks to analyze.");
        return Ok(());
    }

    let mut detector_config = ZoomDetectorConfig::from(&config.zoom);
    if let Some(level) = zoom_level {
        detector_config.zoom_level = level;
    }
    if let Some(dwell) = dwell {
        detector_config.dwell_threshold_secs = dwell;
    }
    if let Some(transition) = transition {
        detector_config.transition_duration_secs = transition;
    }
    let detector = ZoomDetector::new(detector_config);

    let regions = detector.detect_regions(metadata, duration);
    println!("  Detected {} zoom regions:", regions.len());
    for (i, region) in regions.iter().enumerate() {
        println!(
            "    [{i}] {:.2}s - {:.2}s  center ({:.3}, {:.3})  {} clicks",
            region.start, region.end, region.center.x, region.center.y, region.click_count
        );
    }

    let keyframes = detector.detect(metadata, duration);
    println!("  Generated {} keyframes", keyframes.len());
    for kf in &keyframes {
        println!(
            "    t={:.3}s  zoom={:.2}x  center ({:.3}, {:.3})",
            kf.t, kf.zoom_level, kf.center_x, kf.center_y
        );
    }

    if let Some(path) = write_editor {
        let mut editor = if path.exists() {
            EditorState::load(&path).map_err(|e| anyhow::anyhow!("Failed to load editor state: {e}"))?
        } else {
            EditorState::default()
        };
        // Keep manual keyframes; replace previously detected ones.
        editor.zoom_keyframes.retain(|k| !k.is_auto);
        editor.zoom_keyframes.extend(keyframes);
        editor.zoom_keyframes.sort_by(|a, b| a.t.total_cmp(&b.t));
        editor
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save editor state: {e}"))?;
        println!("  Editor state saved to: {}", path.display());
    }

    println!("\nAnalysis complete.");
    Ok(())
}
