use std::path::PathBuf;

use crate::identity::sample::Sample;

use super::export_error::ExportError;

/// What a successful export produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportReceipt {
    pub track_id: u32,
    pub confidence: f64,
    pub image_path: PathBuf,
}

/// Turns one identity's selected sample into a persisted snapshot and a
/// stored descriptor. Called at most once per identity.
pub trait FaceExporter: Send + Sync {
    fn export(&self, track_id: u32, sample: &Sample) -> Result<ExportReceipt, ExportError>;
}
