use crate::shared::frame::Frame;

/// Computes a fixed-length identity descriptor for a face crop.
///
/// Shared between export workers, so implementations must be `Sync`.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, crop: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}
