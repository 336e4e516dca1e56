//! Renders detections and an FPS readout into a transparent RGBA image.

use image::{Rgba, RgbaImage};

use crate::detect::Detection;
use crate::overlay::font::{glyph_bits, GLYPH_ADVANCE, GLYPH_HEIGHT};
use crate::OverlayConfig;

const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const LABEL_BG: Rgba<u8> = Rgba([0, 255, 0, 180]);
const LABEL_FG: Rgba<u8> = Rgba([0, 0, 0, 255]);
const FPS_BG: Rgba<u8> = Rgba([0, 0, 0, 140]);
const FPS_FG: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BOX_STROKE: i32 = 2;

/// Stateless overlay renderer; every call produces a fresh image. The
/// caller throttles calls to the overlay rate.
pub struct Compositor {
    draw_conf_floor: f32,
    min_label_area: i32,
}

impl Compositor {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            draw_conf_floor: config.draw_conf_floor,
            min_label_area: config.min_label_area,
        }
    }

    /// Render `detections` and an optional FPS readout onto a transparent
    /// canvas of the given size.
    ///
    /// Detections below the draw floor are skipped entirely; this floor is
    /// independent of the inference stage's own threshold. Labels only
    /// appear on boxes above the minimum area, to avoid clutter.
    pub fn render(&self, size: (u32, u32), detections: &[Detection], fps: Option<f64>) -> RgbaImage {
        let (width, height) = size;
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

        for det in detections {
            if det.confidence < self.draw_conf_floor {
                continue;
            }

            for inset in 0..BOX_STROKE {
                hollow_rect(
                    &mut img,
                    det.x1 + inset,
                    det.y1 + inset,
                    det.x2 - inset,
                    det.y2 - inset,
                    BOX_COLOR,
                );
            }

            if det.area() > self.min_label_area {
                let label = det.label();
                let tw = text_width(&label);
                let ylab = (det.y1 - GLYPH_HEIGHT - 4).max(0);
                fill_rect(
                    &mut img,
                    det.x1,
                    ylab,
                    det.x1 + tw + 4,
                    ylab + GLYPH_HEIGHT + 2,
                    LABEL_BG,
                );
                draw_text(&mut img, det.x1 + 2, ylab + 1, &label, LABEL_FG);
            }
        }

        if let Some(fps) = fps {
            let text = format!("FPS: {:.1}", fps);
            let tw = text_width(&text);
            fill_rect(&mut img, 8, 8, 8 + tw + 6, 8 + GLYPH_HEIGHT + 4, FPS_BG);
            draw_text(&mut img, 10, 10, &text, FPS_FG);
        }

        img
    }
}

fn hollow_rect(img: &mut RgbaImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba<u8>) {
    let width = img.width() as i32;
    let height = img.height() as i32;
    let left = x1.clamp(0, width - 1);
    let right = x2.clamp(0, width - 1);
    let top = y1.clamp(0, height - 1);
    let bottom = y2.clamp(0, height - 1);
    if left > right || top > bottom {
        return;
    }

    for x in left..=right {
        *img.get_pixel_mut(x as u32, top as u32) = color;
        *img.get_pixel_mut(x as u32, bottom as u32) = color;
    }
    for y in top..=bottom {
        *img.get_pixel_mut(left as u32, y as u32) = color;
        *img.get_pixel_mut(right as u32, y as u32) = color;
    }
}

fn fill_rect(img: &mut RgbaImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba<u8>) {
    let width = img.width() as i32;
    let height = img.height() as i32;
    let left = x1.clamp(0, width - 1);
    let right = x2.clamp(0, width - 1);
    let top = y1.clamp(0, height - 1);
    let bottom = y2.clamp(0, height - 1);

    for y in top..=bottom {
        for x in left..=right {
            *img.get_pixel_mut(x as u32, y as u32) = color;
        }
    }
}

fn draw_text(img: &mut RgbaImage, mut x: i32, y: i32, text: &str, color: Rgba<u8>) {
    let width = img.width() as i32;
    let height = img.height() as i32;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                let py = y + row as i32;
                if py < 0 || py >= height {
                    continue;
                }
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        let px = x + col;
                        if px >= 0 && px < width {
                            *img.get_pixel_mut(px as u32, py as u32) = color;
                        }
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(conf: f32, x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            class: "person".into(),
            confidence: conf,
        }
    }

    fn compositor() -> Compositor {
        Compositor::new(&OverlayConfig::default())
    }

    #[test]
    fn background_is_transparent() {
        let img = compositor().render((64, 64), &[], None);
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn box_edges_are_drawn() {
        let img = compositor().render((200, 200), &[det(0.9, 10, 10, 50, 50)], None);
        assert_eq!(*img.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*img.get_pixel(30, 10), BOX_COLOR);
        assert_eq!(*img.get_pixel(50, 50), BOX_COLOR);
        // Interior stays transparent
        assert_eq!(img.get_pixel(30, 30).0[3], 0);
    }

    #[test]
    fn low_confidence_boxes_are_skipped() {
        let img = compositor().render((200, 200), &[det(0.4, 10, 10, 50, 50)], None);
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn small_boxes_get_no_label() {
        // 40x40 = 1600 px^2, below the 2000 threshold
        let img = compositor().render((200, 200), &[det(0.9, 60, 60, 100, 100)], None);
        // The label strip would occupy rows just above the box
        assert!((60..=100u32).all(|x| img.get_pixel(x, 52).0[3] == 0));
    }

    #[test]
    fn large_boxes_get_label_strip() {
        let img = compositor().render((300, 300), &[det(0.9, 60, 60, 160, 160)], None);
        // Label background sits above the box top edge
        assert_eq!(*img.get_pixel(61, 50), LABEL_BG);
    }

    #[test]
    fn fps_readout_is_drawn_in_corner() {
        let img = compositor().render((200, 200), &[], Some(12.5));
        assert_eq!(*img.get_pixel(9, 9), FPS_BG);
        // Some glyph pixels exist inside the chip
        let lit = (10..60u32)
            .flat_map(|x| (10..18u32).map(move |y| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) == FPS_FG);
        assert!(lit);
    }

    #[test]
    fn boxes_touching_the_border_are_clamped() {
        let img = compositor().render((64, 64), &[det(0.9, -5, -5, 80, 80)], None);
        assert_eq!(*img.get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*img.get_pixel(63, 63), BOX_COLOR);
    }
}
