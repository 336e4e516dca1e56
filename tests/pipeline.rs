//! End-to-end pipeline scenarios with synthetic source, stub model and a
//! recording preview surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use argus::capture::{Frame, FrameSource};
use argus::detect::{Detection, Detector};
use argus::display::{PreviewError, PreviewMode, PreviewSurface};
use argus::pipeline::{ExitReason, Orchestrator};
use argus::Config;
use color_eyre::Result;
use image::RgbaImage;

const WIDTH: u32 = 96;
const HEIGHT: u32 = 96;

/// Produces solid-color frames at roughly 30 fps.
struct SyntheticSource {
    sequence: u64,
}

impl FrameSource for SyntheticSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        std::thread::sleep(Duration::from_millis(33));
        self.sequence += 1;
        Ok(Frame::rgb(
            vec![90u8; (WIDTH * HEIGHT * 3) as usize],
            self.sequence,
            WIDTH,
            HEIGHT,
        ))
    }

    fn stop(&mut self) {}
}

/// Returns one fixed person box on every call.
struct StubDetector;

impl Detector for StubDetector {
    fn infer(&mut self, _frame: &Frame, _input_size: u32, _conf_floor: f32) -> Result<Vec<Detection>> {
        Ok(vec![Detection {
            x1: 10,
            y1: 10,
            x2: 50,
            y2: 50,
            class: "person".into(),
            confidence: 0.9,
        }])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Started,
    Present,
    SetOverlay,
    ClearOverlay,
    Stopped,
}

/// Records the call sequence and keeps the last non-empty overlay.
#[derive(Default)]
struct RecordingPreview {
    calls: Vec<Call>,
    last_overlay: Option<RgbaImage>,
}

impl PreviewSurface for RecordingPreview {
    fn start(&mut self, _modes: &[PreviewMode]) -> std::result::Result<(), PreviewError> {
        self.calls.push(Call::Started);
        Ok(())
    }

    fn present(&mut self, _frame: &Frame) -> std::result::Result<(), PreviewError> {
        self.calls.push(Call::Present);
        Ok(())
    }

    fn set_overlay(&mut self, overlay: Option<RgbaImage>) {
        match overlay {
            Some(img) => {
                self.calls.push(Call::SetOverlay);
                self.last_overlay = Some(img);
            }
            None => self.calls.push(Call::ClearOverlay),
        }
    }

    fn poll_interrupt(&mut self) -> bool {
        false
    }

    fn stop(&mut self) {
        self.calls.push(Call::Stopped);
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.capture.width = WIDTH;
    config.capture.height = HEIGHT;
    config
}

fn run_pipeline_for(duration: Duration) -> (RecordingPreview, argus::pipeline::PipelineReport) {
    let mut preview = RecordingPreview::default();
    preview.start(&[PreviewMode::Accelerated]).unwrap();

    let interrupt = Arc::new(AtomicBool::new(false));
    let timer_flag = interrupt.clone();
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        timer_flag.store(true, Ordering::Relaxed);
    });

    let mut orchestrator = Orchestrator::new(test_config());
    let report = orchestrator
        .run(
            Box::new(SyntheticSource { sequence: 0 }),
            Box::new(StubDetector),
            &mut preview,
            interrupt,
        )
        .unwrap();
    (preview, report)
}

#[test]
fn overlay_shows_detection_box_and_fps_readout() {
    let (preview, report) = run_pipeline_for(Duration::from_secs(2));

    assert_eq!(report.reason, ExitReason::Interrupted);
    assert!(report.stats.frames_captured > 0);
    assert!(report.stats.frames_inferred > 0);

    let overlay = preview.last_overlay.expect("an overlay was pushed");
    assert_eq!((overlay.width(), overlay.height()), (WIDTH, HEIGHT));

    // The stub box is constant, so smoothing leaves it at {10,10,50,50}.
    // Check edges outside the FPS chip area in the top-left corner.
    assert_eq!(overlay.get_pixel(30, 50).0, [0, 255, 0, 255]);
    assert_eq!(overlay.get_pixel(10, 40).0, [0, 255, 0, 255]);
    assert_eq!(overlay.get_pixel(50, 40).0, [0, 255, 0, 255]);
    // Interior stays transparent
    assert_eq!(overlay.get_pixel(30, 35).0[3], 0);

    // FPS chip occupies the top-left corner with lit glyph pixels inside
    assert!(overlay.get_pixel(9, 9).0[3] > 0);
    let glyphs_lit = (10..40u32)
        .flat_map(|x| (10..18u32).map(move |y| (x, y)))
        .any(|(x, y)| overlay.get_pixel(x, y).0 == [255, 255, 255, 255]);
    assert!(glyphs_lit);
}

#[test]
fn shutdown_clears_overlay_before_releasing_surface() {
    let (preview, report) = run_pipeline_for(Duration::from_millis(700));

    // Both stages terminated within the join timeout
    assert!(report.abandoned.is_empty());
    assert!(report.failures.is_empty());

    assert!(preview.calls.contains(&Call::Present));
    assert!(preview.calls.contains(&Call::SetOverlay));

    // The final two surface interactions: clear the overlay, then stop
    let clear_pos = preview
        .calls
        .iter()
        .rposition(|c| *c == Call::ClearOverlay)
        .expect("overlay was cleared");
    let stop_pos = preview
        .calls
        .iter()
        .rposition(|c| *c == Call::Stopped)
        .expect("surface was stopped");
    assert!(clear_pos < stop_pos);
    assert_eq!(stop_pos, preview.calls.len() - 1);
}

#[test]
fn stage_death_shuts_down_the_pipeline() {
    struct FailingDetector;
    impl Detector for FailingDetector {
        fn infer(
            &mut self,
            _frame: &Frame,
            _input_size: u32,
            _conf_floor: f32,
        ) -> Result<Vec<Detection>> {
            Err(color_eyre::eyre::eyre!("model exploded"))
        }
    }

    let mut preview = RecordingPreview::default();
    preview.start(&[PreviewMode::Accelerated]).unwrap();

    let mut orchestrator = Orchestrator::new(test_config());
    let report = orchestrator
        .run(
            Box::new(SyntheticSource { sequence: 0 }),
            Box::new(FailingDetector),
            &mut preview,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

    assert_eq!(report.reason, ExitReason::StageDied("inference"));
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("model exploded"));
    // Shutdown still ran in order
    assert_eq!(*preview.calls.last().unwrap(), Call::Stopped);
}
