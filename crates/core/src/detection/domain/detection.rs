use crate::shared::bounding_box::BoundingBox;

/// One frame-local face candidate, already confidence-filtered and NMS'd.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64) -> Self {
        Self { bbox, confidence }
    }
}
