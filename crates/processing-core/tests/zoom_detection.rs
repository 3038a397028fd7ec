//! End-to-end checks from a `cursor.json` document to a zoom timeline.

use reel_processing_core::{CursorLookup, CursorMetadataProvider, ZoomDetector, ZoomDetectorConfig};
use reel_project_model::cursor::CursorMetadataFile;
use reel_project_model::zoom::ZoomTimeline;

const CURSOR_JSON: &str = r#"{
    "version": 1,
    "captureAreaWidth": 1440,
    "captureAreaHeight": 900,
    "displayScale": 2.0,
    "sampleRateHz": 60,
    "samples": [
        {"t": 0.0, "x": 0.1, "y": 0.1, "p": false},
        {"t": 1.0, "x": 0.5, "y": 0.5, "p": true},
        {"t": 2.0, "x": 0.9, "y": 0.1, "p": false}
    ],
    "clicks": [
        {"t": 3.0, "x": 0.8, "y": 0.2, "button": 0},
        {"t": 1.0, "x": 0.5, "y": 0.5, "button": 0}
    ],
    "keystrokes": [
        {"t": 0.5, "keyCode": 12, "modifiers": 0, "isDown": true}
    ]
}"#;

#[test]
fn test_detected_timeline_zooms_around_clicks() {
    let metadata = CursorMetadataFile::from_json(CURSOR_JSON).unwrap();
    let detector = ZoomDetector::new(ZoomDetectorConfig::default());

    let regions = detector.detect_regions(&metadata, 4.0);
    assert_eq!(regions.len(), 2);
    assert!((regions[0].start - 1.0).abs() < 1e-9);

    let timeline = ZoomTimeline::new(detector.detect(&metadata, 4.0));
    assert!((timeline.zoom_at(0.0) - 1.0).abs() < 1e-9);
    assert!((timeline.zoom_at(1.2) - 2.0).abs() < 1e-9);
    assert!((timeline.zoom_at(3.2) - 2.0).abs() < 1e-9);
    assert!((timeline.zoom_at(4.0) - 1.0).abs() < 1e-9);

    let focus = timeline.state_at(3.2).focus;
    assert!((focus.x - 0.8).abs() < 1e-9);
    assert!((focus.y - 0.2).abs() < 1e-9);
}

#[test]
fn test_snapshot_linear_lookup_from_json() {
    let metadata = CursorMetadataFile::from_json(CURSOR_JSON).unwrap();
    let provider = CursorMetadataProvider::from_file(metadata);
    let snapshot = provider.make_snapshot(None, CursorLookup::Linear);

    let p = snapshot.position_at(0.5);
    assert!((p.x - 0.3).abs() < 1e-9);
    assert!((p.y - 0.3).abs() < 1e-9);
    assert!(snapshot.is_pressed(1.5));
    assert_eq!(snapshot.active_clicks(1.2, 0.4).len(), 1);
}
