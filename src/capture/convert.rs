//! Pixel-layout normalization: every frame entering the pipeline is RGB24.

use color_eyre::{eyre::eyre, Result};
use jpeg_decoder::Decoder;

use super::frame::PixelFormat;

/// Convert raw frame data to tightly-packed RGB24.
pub fn normalize_rgb(data: &[u8], format: PixelFormat) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => Ok(data.to_vec()),
        PixelFormat::Bgr24 => {
            let mut rgb = Vec::with_capacity(data.len());
            for px in data.chunks_exact(3) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
            Ok(rgb)
        }
        PixelFormat::Xbgr32 => {
            // [X, B, G, R] per pixel
            let mut rgb = Vec::with_capacity(data.len() / 4 * 3);
            for px in data.chunks_exact(4) {
                rgb.extend_from_slice(&[px[3], px[2], px[1]]);
            }
            Ok(rgb)
        }
        PixelFormat::Yuyv4 => Ok(yuyv_to_rgb(data)),
        PixelFormat::Mjpeg => {
            let mut decoder = Decoder::new(data);
            let pixels = decoder.decode()?;
            let info = decoder
                .info()
                .ok_or_else(|| eyre!("JPEG decoder produced no image info"))?;
            match info.pixel_format {
                jpeg_decoder::PixelFormat::RGB24 => Ok(pixels),
                other => Err(eyre!("unsupported JPEG pixel format: {:?}", other)),
            }
        }
    }
}

/// YUYV 4:2:2 to RGB24, BT.601 full range.
fn yuyv_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(data.len() / 2 * 3);
    for px in data.chunks_exact(4) {
        let (y0, u, y1, v) = (px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32);
        for y in [y0, y1] {
            let r = y + 1.402 * (v - 128.0);
            let g = y - 0.344 * (u - 128.0) - 0.714 * (v - 128.0);
            let b = y + 1.772 * (u - 128.0);
            rgb.push(r.clamp(0.0, 255.0) as u8);
            rgb.push(g.clamp(0.0, 255.0) as u8);
            rgb.push(b.clamp(0.0, 255.0) as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_passes_through() {
        let data = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(normalize_rgb(&data, PixelFormat::Rgb24).unwrap(), data);
    }

    #[test]
    fn bgr_swaps_channels() {
        let data = [10u8, 20, 30];
        assert_eq!(normalize_rgb(&data, PixelFormat::Bgr24).unwrap(), [30, 20, 10]);
    }

    #[test]
    fn xbgr_drops_padding_and_reorders() {
        let data = [0u8, 40, 50, 60];
        assert_eq!(normalize_rgb(&data, PixelFormat::Xbgr32).unwrap(), [60, 50, 40]);
    }

    #[test]
    fn yuyv_gray_midpoint() {
        // Y=128, U=V=128 is mid gray in both pixels of the pair
        let data = [128u8, 128, 128, 128];
        assert_eq!(
            normalize_rgb(&data, PixelFormat::Yuyv4).unwrap(),
            [128, 128, 128, 128, 128, 128]
        );
    }
}
