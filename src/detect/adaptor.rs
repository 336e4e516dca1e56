//! Feedback controller for the two inference quality knobs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::info;

use crate::detect::InferenceKnobs;
use crate::{DetectConfig, PipelineConfig};

/// Observes measured display FPS and walks the decimation factor and
/// inference input resolution toward the target frame rate.
///
/// Exactly one knob moves per adjustment, decimation before resolution in
/// both directions. Owned and mutated by the render loop only.
pub struct PerformanceAdaptor {
    target_fps: f64,
    adjustment_interval: Duration,
    min_samples: usize,
    fps_history: VecDeque<f64>,
    fps_window: usize,
    last_adjustment: Instant,

    skip: u32,
    max_skip: u32,
    input_size: u32,
    min_input_size: u32,
    max_input_size: u32,
    size_step: u32,
}

impl PerformanceAdaptor {
    pub fn new(detect: &DetectConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            target_fps: pipeline.target_fps,
            adjustment_interval: Duration::from_secs_f64(pipeline.adjustment_interval_secs),
            min_samples: pipeline.min_fps_samples,
            fps_history: VecDeque::with_capacity(pipeline.fps_window),
            fps_window: pipeline.fps_window,
            last_adjustment: Instant::now(),
            skip: detect.frame_skip,
            max_skip: detect.max_frame_skip,
            input_size: detect.input_size,
            min_input_size: detect.min_input_size,
            max_input_size: detect.input_size,
            size_step: detect.input_size_step,
        }
    }

    /// Feed one FPS sample; called on the orchestrator's 1-second tick.
    pub fn update(&mut self, measured_fps: f64) -> InferenceKnobs {
        self.update_at(measured_fps, Instant::now())
    }

    fn update_at(&mut self, measured_fps: f64, now: Instant) -> InferenceKnobs {
        if self.fps_history.len() == self.fps_window {
            self.fps_history.pop_front();
        }
        self.fps_history.push_back(measured_fps);

        let gate_open = now.duration_since(self.last_adjustment) >= self.adjustment_interval
            && self.fps_history.len() >= self.min_samples;
        if gate_open {
            let avg_fps: f64 =
                self.fps_history.iter().sum::<f64>() / self.fps_history.len() as f64;

            if avg_fps < self.target_fps * 0.8 {
                if self.skip < self.max_skip {
                    self.skip += 1;
                    info!(
                        "Performance low ({:.1} FPS), increasing frame skip to {}",
                        avg_fps, self.skip
                    );
                } else if self.input_size > self.min_input_size {
                    self.input_size =
                        self.min_input_size.max(self.input_size - self.size_step);
                    info!("Reducing inference input size to {}", self.input_size);
                }
            } else if avg_fps > self.target_fps * 1.3 {
                if self.skip > 1 {
                    self.skip -= 1;
                    info!(
                        "Performance good ({:.1} FPS), reducing frame skip to {}",
                        avg_fps, self.skip
                    );
                } else if self.input_size < self.max_input_size {
                    self.input_size =
                        self.max_input_size.min(self.input_size + self.size_step);
                    info!("Increasing inference input size to {}", self.input_size);
                }
            }

            // The interval timer resets on every gated evaluation, even a
            // no-op one.
            self.last_adjustment = now;
        }

        InferenceKnobs {
            frame_skip: self.skip,
            input_size: self.input_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adaptor() -> PerformanceAdaptor {
        PerformanceAdaptor::new(&DetectConfig::default(), &PipelineConfig::default())
    }

    fn feed(a: &mut PerformanceAdaptor, fps: f64, samples: usize) -> InferenceKnobs {
        // Space samples one second apart so the 3s interval gate opens.
        let mut now = a.last_adjustment;
        let mut knobs = InferenceKnobs {
            frame_skip: a.skip,
            input_size: a.input_size,
        };
        for _ in 0..samples {
            now += Duration::from_secs(1);
            knobs = a.update_at(fps, now);
        }
        knobs
    }

    #[test]
    fn low_fps_first_bumps_decimation_only() {
        let mut a = adaptor();
        let knobs = feed(&mut a, 3.0, 5);
        assert_eq!(knobs.frame_skip, 3);
        assert_eq!(knobs.input_size, 416);
    }

    #[test]
    fn high_fps_at_min_skip_grows_resolution_one_step() {
        let mut a = adaptor();
        a.skip = 1;
        a.input_size = 320;
        let knobs = feed(&mut a, 20.0, 5);
        assert_eq!(knobs.frame_skip, 1);
        assert_eq!(knobs.input_size, 416);
    }

    #[test]
    fn knobs_stay_inside_bounds() {
        let mut a = adaptor();
        for _ in 0..20 {
            feed(&mut a, 1.0, 5);
        }
        assert_eq!(a.skip, 4);
        assert_eq!(a.input_size, 320);

        for _ in 0..20 {
            feed(&mut a, 40.0, 5);
        }
        assert_eq!(a.skip, 1);
        assert_eq!(a.input_size, 416);
    }

    #[test]
    fn in_band_fps_changes_nothing() {
        let mut a = adaptor();
        let knobs = feed(&mut a, 12.0, 10);
        assert_eq!(knobs.frame_skip, 2);
        assert_eq!(knobs.input_size, 416);
    }

    #[test]
    fn gate_needs_both_samples_and_interval() {
        let mut a = adaptor();
        let start = a.last_adjustment;
        // Four quick samples: interval elapsed but too few samples
        for i in 0..4 {
            a.update_at(3.0, start + Duration::from_secs(4 + i));
        }
        assert_eq!(a.skip, 2);
        // Fifth sample opens the gate
        a.update_at(3.0, start + Duration::from_secs(9));
        assert_eq!(a.skip, 3);
    }

    #[test]
    fn one_knob_per_adjustment() {
        let mut a = adaptor();
        a.skip = 4;
        // Next degradation must touch resolution, not skip (already capped)
        let knobs = feed(&mut a, 3.0, 5);
        assert_eq!(knobs.frame_skip, 4);
        assert_eq!(knobs.input_size, 320);
    }
}
