pub mod adaptor;
pub mod detector;
pub mod onnx;
pub mod smoother;
pub mod stage;

pub use adaptor::PerformanceAdaptor;
pub use detector::Detector;
pub use smoother::DetectionSmoother;
pub use stage::InferenceKnobs;

use std::sync::Arc;

/// One detected object: axis-aligned box in frame-pixel coordinates with a
/// typed confidence. Confidence travels as a numeric field end to end;
/// nothing downstream parses it back out of the label text.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub class: Arc<str>,
    pub confidence: f32,
}

impl Detection {
    pub fn area(&self) -> i32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    /// Display label, e.g. `person 0.93`.
    pub fn label(&self) -> String {
        format!("{} {:.2}", self.class, self.confidence)
    }

    /// Clamp coordinates into `[0, width)` x `[0, height)`, keeping
    /// x1 <= x2 and y1 <= y2.
    pub fn clamped(mut self, width: u32, height: u32) -> Self {
        let max_x = width as i32 - 1;
        let max_y = height as i32 - 1;
        self.x1 = self.x1.clamp(0, max_x);
        self.x2 = self.x2.clamp(self.x1, max_x);
        self.y1 = self.y1.clamp(0, max_y);
        self.y2 = self.y2.clamp(self.y1, max_y);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            class: "person".into(),
            confidence: 0.9,
        }
    }

    #[test]
    fn clamp_bounds_coordinates() {
        let d = det(-10, -5, 2000, 900).clamped(1280, 720);
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (0, 0, 1279, 719));
    }

    #[test]
    fn clamp_keeps_ordering() {
        let d = det(1500, 800, 1600, 900).clamped(1280, 720);
        assert!(d.x1 <= d.x2 && d.y1 <= d.y2);
        assert!(d.x2 < 1280 && d.y2 < 720);
    }

    #[test]
    fn label_embeds_confidence() {
        assert_eq!(det(0, 0, 10, 10).label(), "person 0.90");
    }
}
