//! Check system capabilities.

use std::process::Command;

use reel_common::config::{config_file_path, AppConfig};
use reel_render_engine::{FfmpegBackend, MediaBackend, PipelineConfig};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reel System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for binary in [&config.export.ffmpeg_path, &config.export.ffprobe_path] {
        match tool_version(binary) {
            Some(version) => println!("[OK] {binary}: {version}"),
            None => {
                println!("[MISSING] {binary}: not found");
                ready = false;
            }
        }
    }

    let backend = FfmpegBackend::from_config(&config.export);
    println!(
        "[{}] Media backend: {}",
        if backend.is_available() { "OK" } else { "WARN" },
        backend.name()
    );

    let cores = num_cpus::get();
    println!("[OK] CPU cores: {cores}");
    let threads = if config.export.render_threads == 0 {
        cores
    } else {
        config.export.render_threads
    };
    println!("     Render threads: {threads}");

    let pipeline = PipelineConfig::from_defaults(&config.export, 30.0, 1, 1920, 1080);
    println!(
        "     Frames in flight at 1080p: {} (budget {:.1} GB, cap {})",
        pipeline.max_in_flight,
        config.export.memory_budget_bytes as f64 / 1e9,
        config.export.max_in_flight_cap
    );

    println!();
    println!("Config file: {}", config_file_path().display());

    println!();
    if ready {
        println!("All required tools are available. Reel is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to export.");
    }

    Ok(())
}

/// First line of `<binary> -version`.
fn tool_version(binary: &str) -> Option<String> {
    let output = Command::new(binary).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}
