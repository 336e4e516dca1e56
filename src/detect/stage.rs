//! Inference stage: consumes frames, applies decimation, runs the model,
//! publishes results without ever blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info};

use crate::capture::Frame;
use crate::detect::{Detection, Detector};
use crate::pipeline::{PipelineStats, StageError, StageHandle};

/// Inference quality knobs, handed from the adaptor to this stage as an
/// atomic snapshot. Single writer (the render loop), read here each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceKnobs {
    /// Process every Nth frame
    pub frame_skip: u32,
    /// Model input resolution
    pub input_size: u32,
}

/// A detection result: the frame it came from and its detection set.
pub type InferenceResult = (Frame, Vec<Detection>);

/// Spawn the inference thread.
///
/// Receives with a bounded wait so the stop flag is observed at least every
/// `recv_timeout`; a timeout is not an error. Model failure is fatal to the
/// stage. Results are published drop-on-full.
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    mut detector: Box<dyn Detector>,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<InferenceResult>,
    knobs: Arc<ArcSwap<InferenceKnobs>>,
    conf_threshold: f32,
    recv_timeout: Duration,
    stop: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
) -> StageHandle {
    let handle = std::thread::spawn(move || {
        pin_to_last_core();
        let result = run(
            detector.as_mut(),
            &frame_rx,
            &result_tx,
            &knobs,
            conf_threshold,
            recv_timeout,
            &stop,
            &stats,
        );
        if let Err(ref e) = result {
            error!("Inference stage failed: {}", e);
        }
        debug!("Inference stage exiting");
        result
    });
    StageHandle::new("inference", handle)
}

#[allow(clippy::too_many_arguments)]
fn run(
    detector: &mut dyn Detector,
    frame_rx: &Receiver<Frame>,
    result_tx: &Sender<InferenceResult>,
    knobs: &ArcSwap<InferenceKnobs>,
    conf_threshold: f32,
    recv_timeout: Duration,
    stop: &AtomicBool,
    stats: &PipelineStats,
) -> Result<(), StageError> {
    info!("Inference stage running");

    let mut frame_count: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        let frame = match frame_rx.recv_timeout(recv_timeout) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let current = **knobs.load();
        frame_count += 1;
        if frame_count % current.frame_skip as u64 != 0 {
            stats.frame_decimated();
            continue;
        }

        let detections = detector
            .infer(&frame, current.input_size, conf_threshold)
            .map_err(|e| StageError::Inference(e.to_string()))?;

        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| d.confidence >= conf_threshold)
            .collect();

        stats.frame_inferred();
        if result_tx.try_send((frame, detections)).is_err() {
            stats.result_dropped();
        }
    }

    Ok(())
}

fn pin_to_last_core() {
    if let Some(cores) = core_affinity::get_core_ids() {
        if let Some(core) = cores.last() {
            if core_affinity::set_for_current(*core) {
                debug!("Inference thread pinned to core {:?}", core.id);
            }
        }
    }
}
