/// YOLOv8 object detector (COCO-80) using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, class-aware NMS and mapping
/// boxes back to integer frame pixels.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::COCO_CLASS_NAMES;
use crate::shared::frame::Frame;
use crate::shared::geometry::BoundingBox;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Candidates below this score are discarded before NMS. The pipeline
/// applies its own, stricter person threshold afterwards.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// Box (cx, cy, w, h) columns preceding the per-class scores.
const BOX_VALUES: usize = 4;

/// YOLOv8 detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    min_confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLOv8 ONNX export (e.g. `yolo export model=yolov8n.pt format=onnx`).
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 if it is dynamic.
    pub fn new(
        model_path: &Path,
        min_confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded detection model {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            min_confidence,
            input_size,
        })
    }
}

/// CoreML on macOS, DirectML on Windows; ONNX Runtime falls back to CPU
/// when these are unavailable.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    let providers = vec![ort::execution_providers::CoreMLExecutionProvider::default().build()];
    #[cfg(target_os = "windows")]
    let providers = vec![ort::execution_providers::DirectMLExecutionProvider::default().build()];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let providers = Vec::new();
    providers
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = decode_output(data, &shape, &letterbox, self.min_confidence)?;
        let kept = nms(candidates, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|c| to_detection(&c, frame.width(), frame.height()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Scale and padding applied when fitting a frame into the model input.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding uses 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    class_id: usize,
    confidence: f64,
}

/// Parse a YOLOv8 head: `[1, 4 + classes, anchors]` (default export) or
/// `[1, anchors, 4 + classes]`. Boxes come back in frame coordinates.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    min_confidence: f64,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_anchors, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats <= BOX_VALUES {
        return Err(format!("YOLO output has no class scores: {shape:?}").into());
    }
    if data.len() < num_anchors * num_feats {
        return Err("YOLO output shorter than its declared shape".into());
    }

    let value = |anchor: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_anchors + anchor
        } else {
            anchor * num_feats + feat
        };
        data[idx] as f64
    };

    let mut candidates = Vec::new();
    for anchor in 0..num_anchors {
        let (class_id, confidence) = (BOX_VALUES..num_feats)
            .map(|f| (f - BOX_VALUES, value(anchor, f)))
            .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if confidence < min_confidence {
            continue;
        }

        let cx = value(anchor, 0);
        let cy = value(anchor, 1);
        let w = value(anchor, 2);
        let h = value(anchor, 3);
        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        candidates.push(Candidate {
            x1,
            y1,
            x2,
            y2,
            class_id,
            confidence,
        });
    }
    Ok(candidates)
}

/// Greedy per-class NMS: sort by confidence, suppress same-class overlaps.
fn nms(mut dets: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for det in dets {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && candidate_iou(k, &det) > iou_thresh);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

fn candidate_iou(a: &Candidate, b: &Candidate) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

/// Truncate to integer pixels and clamp into the frame.
fn to_detection(c: &Candidate, frame_w: u32, frame_h: u32) -> Detection {
    let max_x = frame_w as f64;
    let max_y = frame_h as f64;
    let bbox = BoundingBox::new(
        c.x1.clamp(0.0, max_x) as i32,
        c.y1.clamp(0.0, max_y) as i32,
        c.x2.clamp(0.0, max_x) as i32,
        c.y2.clamp(0.0, max_y) as i32,
    );
    let label = COCO_CLASS_NAMES
        .get(c.class_id)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("class_{}", c.class_id));
    Detection::new(label, c.confidence, bbox)
}
