/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, confidence gating and NMS.
/// Identity tracking is a separate stage; this adapter only reports boxes.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;
use super::math::non_max_suppression;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Thresholds applied to raw model output before detections leave the adapter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionThresholds {
    /// Raw candidates must score strictly above this.
    pub confidence: f64,
    pub nms_score: f64,
    pub nms_iou: f64,
}

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    thresholds: DetectionThresholds,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(
        model_path: &Path,
        thresholds: DetectionThresholds,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
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

        Ok(Self {
            session,
            thresholds,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = parse_candidates(data, shape[1], shape[2], &letterbox);
        Ok(filter_candidates(candidates, &self.thresholds))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` as an NCHW float32 tensor.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 gray padding, YOLO convention
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
// Post-processing
// ---------------------------------------------------------------------------

/// Candidate box in frame coordinates, corner form.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    ltrb: [f64; 4],
    confidence: f64,
}

/// Reads `[cx, cy, w, h, conf, ...]` rows from a `[1, A, B]` output.
///
/// YOLO exports are either `[1, features, anchors]` (transposed) or
/// `[1, anchors, features]`; the smaller axis is taken as features.
fn parse_candidates(data: &[f32], dim1: usize, dim2: usize, lb: &Letterbox) -> Vec<Candidate> {
    let transposed = dim1 < dim2;
    let (num_dets, num_feats) = if transposed { (dim2, dim1) } else { (dim1, dim2) };
    if num_feats < 5 {
        return Vec::new();
    }

    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data.get(idx).copied().unwrap_or(0.0) as f64
    };

    (0..num_dets)
        .map(|i| {
            let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
            let (x1, y1) = lb.to_frame(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = lb.to_frame(cx + w / 2.0, cy + h / 2.0);
            Candidate {
                ltrb: [x1, y1, x2, y2],
                confidence: at(i, 4),
            }
        })
        .collect()
}

/// Confidence gate followed by NMS; survivors come out highest score first.
fn filter_candidates(candidates: Vec<Candidate>, thresholds: &DetectionThresholds) -> Vec<Detection> {
    let accepted: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.confidence > thresholds.confidence)
        .collect();

    let boxes: Vec<[f64; 4]> = accepted.iter().map(|c| c.ltrb).collect();
    let scores: Vec<f64> = accepted.iter().map(|c| c.confidence).collect();

    non_max_suppression(&boxes, &scores, thresholds.nms_score, thresholds.nms_iou)
        .into_iter()
        .map(|i| {
            let [l, t, r, b] = accepted[i].ltrb;
            Detection::new(BoundingBox::from_ltrb(l, t, r, b), accepted[i].confidence)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> DetectionThresholds {
        DetectionThresholds {
            confidence: 0.6,
            nms_score: 0.5,
            nms_iou: 0.4,
        }
    }

    fn candidate(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Candidate {
        Candidate {
            ltrb: [x1, y1, x2, y2],
            confidence,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → scale 3.2, 640x320 content, 160px vertical padding
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((lb.scale - 3.2).abs() < 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        assert!((tensor[[0, 0, y, 1]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    const ANCHORS: usize = 6;
    const FEATURES: usize = 5;

    /// Output rows for `ANCHORS` anchors; unlisted anchors are all zeros.
    fn rows(filled: &[[f32; FEATURES]]) -> Vec<[f32; FEATURES]> {
        let mut out = vec![[0.0f32; FEATURES]; ANCHORS];
        out[..filled.len()].copy_from_slice(filled);
        out
    }

    #[test]
    fn test_parse_candidates_row_major_maps_back_to_frame() {
        // [1, anchors, features]: cx=100, cy=100, w=20, h=40, conf=0.9
        let data: Vec<f32> = rows(&[[100.0, 100.0, 20.0, 40.0, 0.9]])
            .into_iter()
            .flatten()
            .collect();
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 20,
        };
        let parsed = parse_candidates(&data, ANCHORS, FEATURES, &lb);
        assert_eq!(parsed.len(), ANCHORS);
        assert_eq!(parsed[0].ltrb, [45.0, 30.0, 55.0, 50.0]);
        assert!((parsed[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_parse_candidates_transposed_layout() {
        // [1, features, anchors]
        let table = rows(&[[10.0, 10.0, 4.0, 4.0, 0.7], [50.0, 50.0, 4.0, 4.0, 0.3]]);
        let data: Vec<f32> = (0..FEATURES)
            .flat_map(|f| table.iter().map(move |row| row[f]))
            .collect();
        let lb = Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        };
        let parsed = parse_candidates(&data, FEATURES, ANCHORS, &lb);
        assert_eq!(parsed.len(), ANCHORS);
        assert_eq!(parsed[1].ltrb, [48.0, 48.0, 52.0, 52.0]);
        assert!((parsed[1].confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_filter_drops_low_confidence() {
        let dets = filter_candidates(
            vec![
                candidate(0.0, 0.0, 10.0, 10.0, 0.6),
                candidate(50.0, 50.0, 60.0, 60.0, 0.61),
            ],
            &thresholds(),
        );
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(50, 50, 10, 10));
    }

    #[test]
    fn test_filter_suppresses_duplicates_keeping_best() {
        let dets = filter_candidates(
            vec![
                candidate(0.0, 0.0, 100.0, 100.0, 0.7),
                candidate(2.0, 2.0, 102.0, 102.0, 0.9),
            ],
            &thresholds(),
        );
        assert_eq!(dets.len(), 1);
        assert!((dets[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_filter_orders_by_confidence() {
        let dets = filter_candidates(
            vec![
                candidate(0.0, 0.0, 10.0, 10.0, 0.7),
                candidate(100.0, 100.0, 110.0, 110.0, 0.95),
            ],
            &thresholds(),
        );
        assert_eq!(dets.len(), 2);
        assert!(dets[0].confidence > dets[1].confidence);
    }
}
