use serde::Serialize;

use super::export_error::ExportError;

/// The body submitted for one exported identity.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DescriptorRecord {
    pub embeddings: Vec<f32>,
    /// Absolute path of the snapshot JPEG.
    pub image_path: String,
}

/// Remote store that accepts face descriptors.
pub trait DescriptorBackend: Send + Sync {
    fn submit(&self, record: &DescriptorRecord) -> Result<(), ExportError>;
}
