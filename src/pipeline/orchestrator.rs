//! Wires the stages together: owns the channels and the stop flag, runs
//! the render/control loop, measures display FPS, drives shutdown.
//!
//! State machine: INIT -> RUNNING -> DRAINING -> STOPPED.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use color_eyre::Result;
use tracing::{error, info};

use crate::capture::{stage as capture_stage, FrameSource};
use crate::detect::stage as inference_stage;
use crate::detect::{Detection, Detector, DetectionSmoother, InferenceKnobs, PerformanceAdaptor};
use crate::display::PreviewSurface;
use crate::overlay::Compositor;
use crate::pipeline::stats::{PipelineStats, StatsSnapshot};
use crate::Config;

/// Why the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// External stop request (signal, window close)
    Interrupted,
    /// A stage died; its failure was fatal to the pipeline
    StageDied(&'static str),
    /// The preview surface stopped accepting frames
    PreviewFailed,
}

/// Structured outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub reason: ExitReason,
    pub stats: StatsSnapshot,
    /// Stages that failed to terminate within the join timeout
    pub abandoned: Vec<&'static str>,
    /// Fatal stage errors collected during draining
    pub failures: Vec<String>,
}

pub struct Orchestrator {
    config: Config,
    stop: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(PipelineStats::default()),
        }
    }

    /// Run the pipeline until `interrupt` is raised, the preview asks to
    /// close, or a stage dies. Blocking; returns after full shutdown.
    pub fn run<P: PreviewSurface>(
        &mut self,
        mut source: Box<dyn FrameSource>,
        detector: Box<dyn Detector>,
        preview: &mut P,
        interrupt: Arc<AtomicBool>,
    ) -> Result<PipelineReport> {
        // INIT: channels, shared knobs, stages
        let cfg = &self.config;
        info!("Pipeline INIT");

        let (frame_tx, frame_rx) = flume::bounded(cfg.pipeline.channel_capacity);
        let (result_tx, result_rx) = flume::bounded(cfg.pipeline.channel_capacity);
        let (preview_tx, preview_rx) = flume::bounded(1);

        let knobs = Arc::new(ArcSwap::from_pointee(InferenceKnobs {
            frame_skip: cfg.detect.frame_skip,
            input_size: cfg.detect.input_size,
        }));

        let mut smoother =
            DetectionSmoother::new(cfg.pipeline.smoothing_factor, cfg.pipeline.history_size);
        let mut adaptor = PerformanceAdaptor::new(&cfg.detect, &cfg.pipeline);
        let compositor = Compositor::new(&cfg.overlay);

        source.start()?;
        let capture = capture_stage::spawn(
            source,
            frame_tx,
            preview_tx,
            self.stop.clone(),
            self.stats.clone(),
        );
        let inference = inference_stage::spawn(
            detector,
            frame_rx,
            result_tx,
            knobs.clone(),
            cfg.detect.conf_threshold,
            Duration::from_millis(cfg.pipeline.inference_recv_timeout_ms),
            self.stop.clone(),
            self.stats.clone(),
        );

        // RUNNING: render/control loop
        info!(
            "Pipeline RUNNING: input_size={}, frame_skip={}, overlay_fps={}",
            cfg.detect.input_size, cfg.detect.frame_skip, cfg.overlay.fps
        );

        let overlay_interval = Duration::from_secs_f64(1.0 / cfg.overlay.fps as f64);
        let frame_size = (cfg.capture.width, cfg.capture.height);
        let mut latest: Vec<Detection> = Vec::new();
        let mut shown_fps = 0.0f64;
        let mut frames_shown = 0u64;
        let mut t_prev = Instant::now();
        let mut last_overlay = Instant::now() - overlay_interval;

        let reason = loop {
            if interrupt.load(Ordering::Relaxed) || preview.poll_interrupt() {
                break ExitReason::Interrupted;
            }
            if capture.is_finished() {
                break ExitReason::StageDied(capture.name());
            }
            if inference.is_finished() {
                break ExitReason::StageDied(inference.name());
            }

            // Present the freshest camera frame, if any arrived
            if let Some(frame) = preview_rx.try_iter().last() {
                if let Err(e) = preview.present(&frame) {
                    error!("Preview error: {}", e);
                    break ExitReason::PreviewFailed;
                }
                frames_shown += 1;
            }

            // Never block the render loop on inference; keep the previous
            // detection set when no new result is waiting
            if let Ok((_, detections)) = result_rx.try_recv() {
                latest = smoother.smooth(detections);
            }

            let now = Instant::now();
            if now.duration_since(t_prev) >= Duration::from_secs(1) {
                shown_fps = frames_shown as f64 / now.duration_since(t_prev).as_secs_f64();
                let new_knobs = adaptor.update(shown_fps);
                knobs.store(Arc::new(new_knobs));

                let snap = self.stats.snapshot();
                metrics::gauge!("display_fps").set(shown_fps);
                metrics::gauge!("frame_skip").set(new_knobs.frame_skip as f64);
                metrics::gauge!("inference_input_size").set(new_knobs.input_size as f64);
                metrics::gauge!("frames_dropped").set(snap.frames_dropped as f64);
                metrics::gauge!("results_dropped").set(snap.results_dropped as f64);
                info!(
                    "Display FPS: {:.1}, frame queue: {}, result queue: {}, detections: {}",
                    shown_fps,
                    preview_rx.len(),
                    result_rx.len(),
                    latest.len()
                );

                frames_shown = 0;
                t_prev = now;
            }

            if now.duration_since(last_overlay) >= overlay_interval {
                let render_start = Instant::now();
                let overlay = compositor.render(frame_size, &latest, Some(shown_fps));
                metrics::histogram!("overlay_render_us")
                    .record(render_start.elapsed().as_micros() as f64);
                preview.set_overlay(Some(overlay));
                self.stats.overlay_rendered();
                last_overlay = now;
            }

            std::thread::sleep(Duration::from_millis(3));
        };

        // DRAINING: raise the stop flag, join with a bounded timeout
        info!("Pipeline DRAINING ({:?})", reason);
        self.stop.store(true, Ordering::Relaxed);

        let join_timeout = Duration::from_millis(cfg.pipeline.stage_join_timeout_ms);
        let mut abandoned = Vec::new();
        let mut failures = Vec::new();
        for stage in [capture, inference] {
            let name = stage.name();
            match stage.join_timeout(join_timeout) {
                None => abandoned.push(name),
                Some(Err(e)) => failures.push(format!("{}: {}", name, e)),
                Some(Ok(())) => {}
            }
        }

        // STOPPED: clear the overlay, release the surface
        preview.set_overlay(None);
        preview.stop();
        info!("Pipeline STOPPED");

        Ok(PipelineReport {
            reason,
            stats: self.stats.snapshot(),
            abandoned,
            failures,
        })
    }
}
