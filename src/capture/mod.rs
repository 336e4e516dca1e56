pub mod convert;
pub mod frame;
pub mod source;
pub mod stage;
pub mod v4l2;

pub use frame::{Frame, FrameMetadata, PixelFormat};
pub use source::FrameSource;
pub use v4l2::V4l2Source;
