use std::sync::Arc;

use crate::export::domain::face_exporter::FaceExporter;
use crate::identity::sample::Sample;
use crate::identity::track_buffer::{ClosedIdentity, ClosureOutcome};

/// Export outcome counts for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub exported: usize,
    pub failed: usize,
    /// Closures whose best crop was empty; never handed to the exporter.
    pub degenerate: usize,
}

impl ExportStats {
    pub fn merge(&mut self, other: ExportStats) {
        self.exported += other.exported;
        self.failed += other.failed;
        self.degenerate += other.degenerate;
    }
}

/// Decides where closed identities get exported.
///
/// The frame loop has already marked each identity exported before it
/// reaches `dispatch`; implementations only run the export itself.
pub trait ExportDispatcher: Send {
    fn dispatch(&mut self, closed: ClosedIdentity);

    /// Waits for all outstanding exports and reports the totals.
    fn finish(self: Box<Self>) -> ExportStats;
}

/// Exports synchronously on the calling thread.
pub struct InlineExportDispatcher {
    exporter: Arc<dyn FaceExporter>,
    stats: ExportStats,
}

impl InlineExportDispatcher {
    pub fn new(exporter: Arc<dyn FaceExporter>) -> Self {
        Self {
            exporter,
            stats: ExportStats::default(),
        }
    }
}

impl ExportDispatcher for InlineExportDispatcher {
    fn dispatch(&mut self, closed: ClosedIdentity) {
        match closed.outcome {
            ClosureOutcome::Selected(sample) => {
                export_one(&*self.exporter, closed.track_id, &sample, &mut self.stats)
            }
            ClosureOutcome::Degenerate { confidence } => {
                log_degenerate(closed.track_id, confidence);
                self.stats.degenerate += 1;
            }
        }
    }

    fn finish(self: Box<Self>) -> ExportStats {
        self.stats
    }
}

/// Runs one export and records the outcome. Failures are logged, never retried.
pub(crate) fn export_one(
    exporter: &dyn FaceExporter,
    track_id: u32,
    sample: &Sample,
    stats: &mut ExportStats,
) {
    match exporter.export(track_id, sample) {
        Ok(receipt) => {
            stats.exported += 1;
            log::info!(
                "Exported identity {track_id} (confidence {:.2}) -> {}",
                receipt.confidence,
                receipt.image_path.display()
            );
        }
        Err(e) => {
            stats.failed += 1;
            log::warn!("Export of identity {track_id} failed: {e}");
        }
    }
}

pub(crate) fn log_degenerate(track_id: u32, confidence: f64) {
    log::warn!(
        "Identity {track_id} closed with an empty best crop (confidence {confidence:.2}); nothing exported"
    );
}
