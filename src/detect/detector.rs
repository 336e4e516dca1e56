//! Detection model boundary.

use color_eyre::Result;

use crate::capture::Frame;
use crate::detect::Detection;

/// An opaque, CPU-bound, synchronous object detector.
///
/// `infer` maps one RGB24 frame to a detection set. `input_size` selects
/// the model input resolution for this call (the performance adaptor moves
/// it at runtime); `conf_floor` is the minimum confidence a detection must
/// reach to be returned. Returned boxes are in frame-pixel coordinates,
/// clamped to the frame bounds.
pub trait Detector: Send {
    fn infer(&mut self, frame: &Frame, input_size: u32, conf_floor: f32) -> Result<Vec<Detection>>;
}
