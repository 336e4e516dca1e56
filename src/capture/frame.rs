use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Frame data with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable pixel data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

impl Frame {
    /// Build an RGB24 frame from raw pixel data.
    pub fn rgb(data: Vec<u8>, sequence: u64, width: u32, height: u32) -> Self {
        Self {
            data: Bytes::from(data),
            meta: Arc::new(FrameMetadata {
                sequence,
                width,
                height,
                stride: width,
                format: PixelFormat::Rgb24,
            }),
            timestamp: Instant::now(),
        }
    }
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
}

/// Pixel layouts we accept from frame sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    /// Padded 32-bit layout [X, B, G, R] as produced by some preview stacks
    Xbgr32,
    Yuyv4,
    Mjpeg,
}
