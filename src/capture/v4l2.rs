//! V4L2-backed frame source.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use tracing::info;
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::capture::frame::{Frame, FrameMetadata, PixelFormat};
use crate::capture::source::FrameSource;
use crate::CaptureConfig;

/// Synchronous V4L2 capture, memory-mapped buffers.
pub struct V4l2Source {
    device: Device,
    stream: Option<MmapStream<'static>>,
    format: PixelFormat,
    width: u32,
    height: u32,
    buffer_count: u32,
    sequence: u64,
}

impl V4l2Source {
    /// Open and configure the device named in `config`, auto-detecting one
    /// when the path is empty.
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let (path, format) = if config.device.is_empty() {
            auto_detect_device()?
        } else {
            let dev = Device::with_path(&config.device)?;
            let format = preferred_format(&dev)
                .ok_or_else(|| eyre!("{}: no MJPEG or YUYV support", config.device))?;
            (config.device.clone(), format)
        };

        info!("Initializing V4L2 capture: {} ({:?})", path, format);
        let device = Device::with_path(&path)?;

        let caps = device.query_caps()?;
        info!("Device: {} ({})", caps.card, caps.driver);
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(eyre!("device doesn't support video capture"));
        }

        let mut fmt = device.format()?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = match format {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
            _ => return Err(eyre!("unsupported pixel format")),
        };
        device.set_format(&fmt)?;

        let mut params = device.params()?;
        params.interval = v4l::Fraction::new(1, config.fps);
        device.set_params(&params)?;

        Ok(Self {
            device,
            stream: None,
            format,
            width: config.width,
            height: config.height,
            buffer_count: config.buffer_count,
            sequence: 0,
        })
    }
}

impl FrameSource for V4l2Source {
    fn start(&mut self) -> Result<()> {
        let stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, self.buffer_count)?;
        self.stream = Some(stream);
        info!("Capture stream started with {} buffers", self.buffer_count);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let timestamp = Instant::now();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| eyre!("stream not started"))?;

        let (buf, _meta) = stream.next()?;
        let data = Bytes::copy_from_slice(buf);

        self.sequence += 1;
        Ok(Frame {
            data,
            meta: Arc::new(FrameMetadata {
                sequence: self.sequence,
                width: self.width,
                height: self.height,
                stride: self.width,
                format: self.format,
            }),
            timestamp,
        })
    }

    fn stop(&mut self) {
        // Dropping the stream turns streaming off
        self.stream = None;
        info!("Capture stream stopped");
    }
}

fn preferred_format(dev: &Device) -> Option<PixelFormat> {
    let formats = dev.enum_formats().ok()?;
    if formats.iter().any(|f| f.fourcc == FourCC::new(b"MJPG")) {
        return Some(PixelFormat::Mjpeg);
    }
    if formats.iter().any(|f| f.fourcc == FourCC::new(b"YUYV")) {
        return Some(PixelFormat::Yuyv4);
    }
    None
}

/// Scan /dev/video* for the first device we can stream from, preferring
/// MJPEG over YUYV.
pub fn auto_detect_device() -> Result<(String, PixelFormat)> {
    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            continue;
        }
        if let Some(format) = preferred_format(&dev) {
            info!("Found {:?} device: {} - {}", format, path, caps.card);
            return Ok((path, format));
        }
    }

    Err(eyre!("no suitable capture device found"))
}
