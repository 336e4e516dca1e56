//! Frame source boundary.

use color_eyre::Result;

use super::frame::Frame;

/// A device-paced producer of raw frames.
///
/// `capture` blocks until the device delivers the next frame; there is no
/// back-pressure signal beyond that call latency. Implementations carry
/// their resolution, pixel format, target frame rate and buffer count from
/// construction.
pub trait FrameSource: Send {
    /// Begin streaming.
    fn start(&mut self) -> Result<()>;

    /// Acquire one frame, blocking until the device produces it.
    fn capture(&mut self) -> Result<Frame>;

    /// Stop streaming and release device resources.
    fn stop(&mut self);
}
