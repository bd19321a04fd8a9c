use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::export::domain::face_exporter::FaceExporter;
use crate::identity::sample::Sample;
use crate::identity::track_buffer::{ClosedIdentity, ClosureOutcome};
use crate::pipeline::export_dispatcher::{export_one, log_degenerate, ExportDispatcher, ExportStats};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Moves exports off the frame loop onto a pool of worker threads.
///
/// Layout: `frame loop → bounded queue → N export workers`
///
/// A full queue blocks the frame loop rather than dropping work. `finish`
/// closes the queue and joins every worker, so no closed identity is
/// abandoned at stream end.
pub struct ThreadedExportDispatcher {
    job_tx: Option<Sender<(u32, Sample)>>,
    workers: Vec<JoinHandle<ExportStats>>,
    stats: ExportStats,
}

impl ThreadedExportDispatcher {
    pub fn new(exporter: Arc<dyn FaceExporter>, worker_count: usize) -> Self {
        Self::with_capacity(exporter, worker_count, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(
        exporter: Arc<dyn FaceExporter>,
        worker_count: usize,
        capacity: usize,
    ) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<(u32, Sample)>(capacity.max(1));
        let workers = (0..worker_count.max(1))
            .map(|_| spawn_worker(exporter.clone(), job_rx.clone()))
            .collect();

        Self {
            job_tx: Some(job_tx),
            workers,
            stats: ExportStats::default(),
        }
    }
}

impl ExportDispatcher for ThreadedExportDispatcher {
    fn dispatch(&mut self, closed: ClosedIdentity) {
        let sample = match closed.outcome {
            ClosureOutcome::Selected(sample) => sample,
            ClosureOutcome::Degenerate { confidence } => {
                log_degenerate(closed.track_id, confidence);
                self.stats.degenerate += 1;
                return;
            }
        };

        let sent = self
            .job_tx
            .as_ref()
            .is_some_and(|tx| tx.send((closed.track_id, sample)).is_ok());
        if !sent {
            log::warn!(
                "Export workers unavailable; identity {} not exported",
                closed.track_id
            );
            self.stats.failed += 1;
        }
    }

    fn finish(mut self: Box<Self>) -> ExportStats {
        drop(self.job_tx.take());

        let mut stats = self.stats;
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(worker_stats) => stats.merge(worker_stats),
                Err(_) => log::error!("Export worker panicked"),
            }
        }
        stats
    }
}

fn spawn_worker(
    exporter: Arc<dyn FaceExporter>,
    job_rx: Receiver<(u32, Sample)>,
) -> JoinHandle<ExportStats> {
    std::thread::spawn(move || {
        let mut stats = ExportStats::default();
        for (track_id, sample) in job_rx {
            export_one(&*exporter, track_id, &sample, &mut stats);
        }
        stats
    })
}
