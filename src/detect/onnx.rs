//! ONNX Runtime detector backend for YOLO-family models.
//!
//! Decodes the `[1, 4 + classes, proposals]` output layout: 4 box rows
//! (cx, cy, w, h in input-size space) followed by one score row per class,
//! stored column-major across proposals.

use std::sync::Arc;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::capture::Frame;
use crate::detect::{Detection, Detector};

/// IoU above which two same-class candidates are considered duplicates.
const IOU_THRESHOLD: f32 = 0.45;

/// COCO class names in model output order.
const CLASS_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: f32,
    class_idx: usize,
}

/// Wraps an ONNX session; class name strings are interned once.
pub struct OnnxDetector {
    session: Session,
    classes: Vec<Arc<str>>,
}

impl OnnxDetector {
    /// Load a YOLO ONNX model from `model_path`.
    pub fn load(model_path: &str) -> Result<Self> {
        info!("Loading detection model: {}", model_path);
        let session = Session::builder()
            .wrap_err("failed to create ORT session builder")?
            .commit_from_file(model_path)
            .wrap_err_with(|| format!("failed to load ONNX model from {}", model_path))?;

        let classes = CLASS_NAMES.iter().map(|n| Arc::from(*n)).collect();
        Ok(Self { session, classes })
    }

    fn preprocess(&self, frame: &Frame, input_size: u32) -> Result<ort::value::DynValue> {
        let img = RgbImage::from_raw(frame.meta.width, frame.meta.height, frame.data.to_vec())
            .ok_or_else(|| eyre!("frame data does not match its dimensions"))?;
        let resized =
            image::imageops::resize(&img, input_size, input_size, image::imageops::FilterType::Triangle);

        // NCHW float tensor, [0, 1] range
        let size = (input_size * input_size) as usize;
        let raw = resized.as_raw();
        let mut tensor_data = vec![0f32; 3 * size];
        for idx in 0..size {
            tensor_data[idx] = raw[idx * 3] as f32 / 255.0;
            tensor_data[size + idx] = raw[idx * 3 + 1] as f32 / 255.0;
            tensor_data[2 * size + idx] = raw[idx * 3 + 2] as f32 / 255.0;
        }

        let shape = [1usize, 3, input_size as usize, input_size as usize];
        Ok(Tensor::from_array((shape, tensor_data.into_boxed_slice()))
            .wrap_err("failed to create input tensor")?
            .into_dyn())
    }
}

impl Detector for OnnxDetector {
    fn infer(&mut self, frame: &Frame, input_size: u32, conf_floor: f32) -> Result<Vec<Detection>> {
        let input = self.preprocess(frame, input_size)?;

        let outputs = self
            .session
            .run(ort::inputs!["images" => input])
            .wrap_err("model inference failed")?;

        let (shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .wrap_err("failed to extract output tensor")?;

        if shape.len() != 3 || shape[1] < 5 {
            return Err(eyre!("unexpected output shape: {:?}", shape));
        }
        let num_classes = (shape[1] - 4) as usize;
        let num_proposals = shape[2] as usize;

        let scale_x = frame.meta.width as f32 / input_size as f32;
        let scale_y = frame.meta.height as f32 / input_size as f32;

        let mut candidates = Vec::new();
        for i in 0..num_proposals {
            let mut best_score = 0f32;
            let mut best_class = 0usize;
            for c in 0..num_classes {
                let s = data[(4 + c) * num_proposals + i];
                if s > best_score {
                    best_score = s;
                    best_class = c;
                }
            }
            if best_score < conf_floor {
                continue;
            }

            let cx = data[i];
            let cy = data[num_proposals + i];
            let w = data[2 * num_proposals + i];
            let h = data[3 * num_proposals + i];

            candidates.push(Candidate {
                x1: (cx - w / 2.0) * scale_x,
                y1: (cy - h / 2.0) * scale_y,
                x2: (cx + w / 2.0) * scale_x,
                y2: (cy + h / 2.0) * scale_y,
                confidence: best_score,
                class_idx: best_class,
            });
        }

        let kept = nms(candidates, IOU_THRESHOLD);
        Ok(kept
            .into_iter()
            .map(|c| {
                let class = self
                    .classes
                    .get(c.class_idx)
                    .cloned()
                    .unwrap_or_else(|| Arc::from(format!("class{}", c.class_idx).as_str()));
                Detection {
                    x1: c.x1 as i32,
                    y1: c.y1 as i32,
                    x2: c.x2 as i32,
                    y2: c.y2 as i32,
                    class,
                    confidence: c.confidence,
                }
                .clamped(frame.meta.width, frame.meta.height)
            })
            .collect())
    }
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

/// Greedy class-aware NMS: sort by confidence descending, suppress
/// same-class overlaps.
fn nms(mut candidates: Vec<Candidate>, iou_thresh: f32) -> Vec<Candidate> {
    candidates.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut suppressed = vec![false; candidates.len()];
    let mut kept = Vec::new();

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if !suppressed[j]
                && candidates[i].class_idx == candidates[j].class_idx
                && iou(&candidates[i], &candidates[j]) > iou_thresh
            {
                suppressed[j] = true;
            }
        }
        kept.push(i);
    }

    let mut keep_flags = vec![false; candidates.len()];
    for &i in &kept {
        keep_flags[i] = true;
    }
    let mut out = Vec::with_capacity(kept.len());
    for (idx, cand) in candidates.drain(..).enumerate() {
        if keep_flags[idx] {
            out.push(cand);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32, class_idx: usize) -> Candidate {
        Candidate {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
            class_idx,
        }
    }

    #[test]
    fn nms_suppresses_same_class_overlap() {
        let kept = nms(
            vec![
                cand(0.0, 0.0, 100.0, 100.0, 0.9, 0),
                cand(5.0, 5.0, 105.0, 105.0, 0.6, 0),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn nms_keeps_overlap_across_classes() {
        let kept = nms(
            vec![
                cand(0.0, 0.0, 100.0, 100.0, 0.9, 0),
                cand(5.0, 5.0, 105.0, 105.0, 0.6, 2),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = cand(0.0, 0.0, 10.0, 10.0, 0.9, 0);
        let b = cand(20.0, 20.0, 30.0, 30.0, 0.9, 0);
        assert_eq!(iou(&a, &b), 0.0);
    }
}
