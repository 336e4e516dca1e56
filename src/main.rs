//! argus - adaptive live object-detection overlay for V4L2 cameras

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use argus::capture::V4l2Source;
use argus::detect::onnx::OnnxDetector;
use argus::display::{PreviewMode, PreviewSurface, Sdl2Preview};
use argus::pipeline::Orchestrator;
use argus::Config;
use color_eyre::{eyre::eyre, Result};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("argus=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("argus launching...");

    let config = Config::load()?;
    info!(
        "Settings: model={}, input_size={}, frame_skip={}, overlay_fps={}",
        config.detect.model_path,
        config.detect.input_size,
        config.detect.frame_skip,
        config.overlay.fps
    );

    let source = V4l2Source::open(&config.capture)?;
    let detector = OnnxDetector::load(&config.detect.model_path)?;

    let sdl = sdl2::init().map_err(|e| eyre!(e))?;
    let mut preview = Sdl2Preview::new(sdl, config.capture.width, config.capture.height);
    preview.start(&[PreviewMode::Accelerated, PreviewMode::Software])?;

    // Interrupt signal raises the shared flag; the run loop observes it
    let interrupt = Arc::new(AtomicBool::new(false));
    let signal_flag = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down...");
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let mut orchestrator = Orchestrator::new(config);
    let report =
        orchestrator.run(Box::new(source), Box::new(detector), &mut preview, interrupt)?;

    for failure in &report.failures {
        error!("Stage failure: {}", failure);
    }
    for name in &report.abandoned {
        error!("Stage abandoned at shutdown: {}", name);
    }
    info!(
        "Frames captured: {}, inferred: {}, dropped: {}, overlays: {}",
        report.stats.frames_captured,
        report.stats.frames_inferred,
        report.stats.frames_dropped,
        report.stats.overlays_rendered
    );
    info!("Shutdown complete.");
    Ok(())
}
