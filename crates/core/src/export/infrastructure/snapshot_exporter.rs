use std::path::{Path, PathBuf};

use crate::export::domain::descriptor_backend::{DescriptorBackend, DescriptorRecord};
use crate::export::domain::export_error::ExportError;
use crate::export::domain::face_embedder::FaceEmbedder;
use crate::export::domain::face_exporter::{ExportReceipt, FaceExporter};
use crate::export::domain::snapshot::snapshot_file_name;
use crate::identity::sample::Sample;
use crate::shared::constants::DESCRIPTOR_LEN;
use crate::video::domain::image_writer::ImageWriter;

/// Exports an identity as a JPEG snapshot plus a descriptor record.
///
/// Order: write snapshot, embed the in-memory crop, check the descriptor
/// length, submit. The backend is never called with a malformed descriptor.
pub struct SnapshotExporter {
    output_dir: PathBuf,
    writer: Box<dyn ImageWriter>,
    embedder: Box<dyn FaceEmbedder>,
    backend: Box<dyn DescriptorBackend>,
    descriptor_len: usize,
}

impl SnapshotExporter {
    pub fn new(
        output_dir: &Path,
        writer: Box<dyn ImageWriter>,
        embedder: Box<dyn FaceEmbedder>,
        backend: Box<dyn DescriptorBackend>,
    ) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            writer,
            embedder,
            backend,
            descriptor_len: DESCRIPTOR_LEN,
        }
    }

    pub fn snapshot_path(&self, track_id: u32, confidence: f64) -> PathBuf {
        self.output_dir.join(snapshot_file_name(track_id, confidence))
    }
}

impl FaceExporter for SnapshotExporter {
    fn export(&self, track_id: u32, sample: &Sample) -> Result<ExportReceipt, ExportError> {
        let path = self.snapshot_path(track_id, sample.confidence);
        let snapshot_err = |message: String| ExportError::Snapshot {
            path: path.clone(),
            message,
        };

        self.writer
            .write(&path, &sample.crop)
            .map_err(|e| snapshot_err(e.to_string()))?;
        let absolute = std::path::absolute(&path).map_err(|e| snapshot_err(e.to_string()))?;

        let embeddings = self
            .embedder
            .embed(&sample.crop)
            .map_err(|e| ExportError::Embedding(e.to_string()))?;
        if embeddings.len() != self.descriptor_len {
            return Err(ExportError::InvalidDescriptor {
                expected: self.descriptor_len,
                actual: embeddings.len(),
            });
        }

        self.backend.submit(&DescriptorRecord {
            embeddings,
            image_path: absolute.to_string_lossy().into_owned(),
        })?;

        Ok(ExportReceipt {
            track_id,
            confidence: sample.confidence,
            image_path: absolute,
        })
    }
}
