use crate::shared::frame::Frame;

use super::detection::Detection;

/// Domain interface for face detection.
///
/// Implementations return detections in their own priority order; the
/// association step relies on that order being stable.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
