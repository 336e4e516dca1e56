//! Preview surface boundary.

use image::RgbaImage;
use thiserror::Error;

use crate::capture::Frame;

/// Renderer modes, tried in priority order by `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    /// Hardware-accelerated renderer with vsync
    Accelerated,
    /// Software renderer fallback
    Software,
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("no preview mode could be started: {0}")]
    AllModesFailed(String),

    #[error("presentation failed: {0}")]
    Present(String),

    #[error("preview not started")]
    NotStarted,
}

/// A live view that composites camera frames with the latest overlay image.
///
/// `start` walks the mode preference list and fails only when every mode
/// fails. `present` shows one camera frame; `set_overlay` replaces (or with
/// `None` clears) the transparent layer drawn over subsequent frames.
pub trait PreviewSurface {
    fn start(&mut self, modes: &[PreviewMode]) -> Result<(), PreviewError>;

    fn present(&mut self, frame: &Frame) -> Result<(), PreviewError>;

    fn set_overlay(&mut self, overlay: Option<RgbaImage>);

    /// Whether the user asked the surface to close (window close, Escape).
    fn poll_interrupt(&mut self) -> bool;

    fn stop(&mut self);
}
