//! Temporal smoothing of detection boxes to reduce positional jitter.

use std::collections::VecDeque;

use crate::detect::Detection;

/// Two detections are "similar" when their classes match and their top-left
/// corners are within this many pixels on each axis.
const SIMILARITY_RADIUS: i32 = 50;

/// Blends each new detection set with a bounded history of past sets.
///
/// History has ring-buffer semantics: the oldest set is evicted when a new
/// one arrives at capacity. Owned and mutated by the render loop only.
pub struct DetectionSmoother {
    smoothing_factor: f32,
    max_history: usize,
    history: VecDeque<Vec<Detection>>,
}

impl DetectionSmoother {
    pub fn new(smoothing_factor: f32, max_history: usize) -> Self {
        Self {
            smoothing_factor,
            max_history,
            history: VecDeque::with_capacity(max_history),
        }
    }

    /// Smooth `current` against the recorded history.
    ///
    /// For each detection, the historical average is taken over every
    /// similar detection across all recorded sets; `current` itself has
    /// already been recorded, so its own entry participates. Output order
    /// matches input order; labels and confidences pass through unchanged.
    pub fn smooth(&mut self, current: Vec<Detection>) -> Vec<Detection> {
        if self.history.len() == self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(current.clone());

        if self.history.len() < 2 {
            return current;
        }

        current
            .into_iter()
            .map(|det| {
                let similar: Vec<&Detection> = self
                    .history
                    .iter()
                    .flatten()
                    .filter(|h| {
                        h.class == det.class
                            && (det.x1 - h.x1).abs() < SIMILARITY_RADIUS
                            && (det.y1 - h.y1).abs() < SIMILARITY_RADIUS
                    })
                    .collect();

                if similar.is_empty() {
                    return det;
                }

                let n = similar.len() as f32;
                let avg_x1 = similar.iter().map(|d| d.x1).sum::<i32>() as f32 / n;
                let avg_y1 = similar.iter().map(|d| d.y1).sum::<i32>() as f32 / n;
                let avg_x2 = similar.iter().map(|d| d.x2).sum::<i32>() as f32 / n;
                let avg_y2 = similar.iter().map(|d| d.y2).sum::<i32>() as f32 / n;

                let alpha = self.smoothing_factor;
                Detection {
                    x1: (det.x1 as f32 * (1.0 - alpha) + avg_x1 * alpha) as i32,
                    y1: (det.y1 as f32 * (1.0 - alpha) + avg_y1 * alpha) as i32,
                    x2: (det.x2 as f32 * (1.0 - alpha) + avg_x2 * alpha) as i32,
                    y2: (det.y2 as f32 * (1.0 - alpha) + avg_y2 * alpha) as i32,
                    ..det
                }
            })
            .collect()
    }
}
