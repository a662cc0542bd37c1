#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::{Frame, CHANNELS};
use crate::geometry::{iou, BBox};

const INPUT_SIZE: u32 = 640;
const NMS_IOU: f32 = 0.45;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub const COCO_CLASSES: [&str; 80] = [
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

/// Tract-based YOLOv8 backend.
///
/// Loads a local ONNX export with a `[1, 3, 640, 640]` input and a
/// `[1, 4 + classes, anchors]` output. Frames are resized (nearest neighbour)
/// to the model input and boxes are scaled back to frame coordinates.
pub struct TractBackend {
    model: Plan,
    conf_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk. `select_backend` runs the warm-up.
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            conf_threshold,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let size = INPUT_SIZE as usize;
        let (fw, fh) = (frame.width as usize, frame.height as usize);
        let pixels = frame.pixels();
        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            let sx = (x * fw / size).min(fw - 1);
            let sy = (y * fh / size).min(fh - 1);
            pixels[(sy * fw + sx) * CHANNELS + channel] as f32 / 255.0
        })
        .into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let (rows, anchors) = (shape[1], shape[2]);

        let sx = frame.width as f32 / INPUT_SIZE as f32;
        let sy = frame.height as f32 / INPUT_SIZE as f32;

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let (mut best_class, mut best_score) = (0usize, f32::MIN);
            for c in 4..rows {
                let score = view[[0, c, a]];
                if score > best_score {
                    best_score = score;
                    best_class = c - 4;
                }
            }
            if best_score < self.conf_threshold {
                continue;
            }
            let (cx, cy, w, h) = (
                view[[0, 0, a]],
                view[[0, 1, a]],
                view[[0, 2, a]],
                view[[0, 3, a]],
            );
            let bbox: BBox = [
                ((cx - w / 2.0) * sx).max(0.0),
                ((cy - h / 2.0) * sy).max(0.0),
                ((cx + w / 2.0) * sx).min(frame.width as f32),
                ((cy + h / 2.0) * sy).min(frame.height as f32),
            ];
            let name = COCO_CLASSES.get(best_class).copied().unwrap_or("unknown");
            candidates.push(Detection::new(
                bbox,
                best_score.clamp(0.0, 1.0),
                best_class as i32,
                name,
            ));
        }

        Ok(non_max_suppression(candidates, NMS_IOU))
    }
}

/// Class-wise greedy NMS, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for cand in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(&k.bbox, &cand.bbox) > threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = INPUT_SIZE as usize;
        let blank = tract_ndarray::Array4::<f32>::zeros((1, 3, size, size)).into_tensor();
        self.model
            .run(tvec!(blank.into()))
            .context("ONNX warm-up inference failed")?;
        log::info!("tract model warmed up");
        Ok(())
    }

    fn detect(&mut self, frame: Option<&Frame>) -> Result<Vec<Detection>> {
        let Some(frame) = frame.filter(|f| !f.is_empty()) else {
            return Ok(Vec::new());
        };
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_keeps_best_of_overlapping_same_class() {
        let kept = non_max_suppression(
            vec![
                Detection::new([0.0, 0.0, 10.0, 10.0], 0.6, 2, "car"),
                Detection::new([1.0, 0.0, 11.0, 10.0], 0.9, 2, "car"),
                Detection::new([1.0, 0.0, 11.0, 10.0], 0.8, 0, "person"),
            ],
            NMS_IOU,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].class_id, 0);
    }
}
