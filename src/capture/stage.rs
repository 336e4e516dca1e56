//! Capture stage: pulls frames from the source on a dedicated thread,
//! normalizes them to RGB24, and publishes without ever blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flume::Sender;
use tracing::{debug, error, info};

use crate::capture::{convert, Frame, FrameSource, PixelFormat};
use crate::pipeline::{PipelineStats, StageError, StageHandle};

/// Spawn the capture thread.
///
/// Every captured frame is normalized and offered to both channels with
/// drop-on-full semantics: `preview_tx` feeds the render loop the freshest
/// frame, `frame_tx` feeds the inference stage. A full channel discards
/// the new frame silently. Acquisition failure is fatal to the stage.
pub fn spawn(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<Frame>,
    preview_tx: Sender<Frame>,
    stop: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
) -> StageHandle {
    let handle = std::thread::spawn(move || {
        let result = run(source.as_mut(), &frame_tx, &preview_tx, &stop, &stats);
        source.stop();
        if let Err(ref e) = result {
            error!("Capture stage failed: {}", e);
        }
        debug!("Capture stage exiting");
        result
    });
    StageHandle::new("capture", handle)
}

fn run(
    source: &mut dyn FrameSource,
    frame_tx: &Sender<Frame>,
    preview_tx: &Sender<Frame>,
    stop: &AtomicBool,
    stats: &PipelineStats,
) -> Result<(), StageError> {
    info!("Capture stage running");

    while !stop.load(Ordering::Relaxed) {
        let raw = source
            .capture()
            .map_err(|e| StageError::Capture(e.to_string()))?;

        let frame = if raw.meta.format == PixelFormat::Rgb24 {
            raw
        } else {
            let rgb = convert::normalize_rgb(&raw.data, raw.meta.format)
                .map_err(|e| StageError::Convert(e.to_string()))?;
            Frame::rgb(rgb, raw.meta.sequence, raw.meta.width, raw.meta.height)
        };

        stats.frame_captured();

        // Frame is a cheap clone: Bytes + Arc metadata
        let _ = preview_tx.try_send(frame.clone());
        if frame_tx.try_send(frame).is_err() {
            stats.frame_dropped();
        }
    }

    Ok(())
}
