pub mod capture;
pub mod detect;
pub mod display;
pub mod overlay;
pub mod pipeline;

use color_eyre::Result;
use serde::{Deserialize, Serialize};

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub detect: DetectConfig,
    pub overlay: OverlayConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device path; empty means auto-detect
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub model_path: String,
    /// Maximum (and initial) inference input resolution
    pub input_size: u32,
    pub min_input_size: u32,
    pub input_size_step: u32,
    pub conf_threshold: f32,
    /// Initial frame decimation factor (process every Nth frame)
    pub frame_skip: u32,
    pub max_frame_skip: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Overlay refresh rate, independent of capture and inference rates
    pub fps: u32,
    /// Secondary confidence floor applied when drawing
    pub draw_conf_floor: f32,
    /// Boxes smaller than this area get no text label
    pub min_label_area: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the frame and result channels
    pub channel_capacity: usize,
    /// Display frame rate the adaptor converges toward
    pub target_fps: f64,
    pub smoothing_factor: f32,
    pub history_size: usize,
    pub fps_window: usize,
    pub min_fps_samples: usize,
    pub adjustment_interval_secs: f64,
    pub inference_recv_timeout_ms: u64,
    pub stage_join_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            detect: DetectConfig::default(),
            overlay: OverlayConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            width: 1280,
            height: 720,
            fps: 30,
            buffer_count: 6,
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            model_path: "yolo11n.onnx".into(),
            input_size: 416,
            min_input_size: 320,
            input_size_step: 96,
            conf_threshold: 0.35,
            frame_skip: 2,
            max_frame_skip: 4,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fps: 15,
            draw_conf_floor: 0.5,
            min_label_area: 2000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 3,
            target_fps: 12.0,
            smoothing_factor: 0.8,
            history_size: 5,
            fps_window: 8,
            min_fps_samples: 5,
            adjustment_interval_secs: 3.0,
            inference_recv_timeout_ms: 100,
            stage_join_timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Load configuration from an optional `argus.toml` and `ARGUS_*`
    /// environment variables, falling back to the built-in defaults.
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name("argus").required(false))
            .add_source(
                config::Environment::with_prefix("ARGUS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}
