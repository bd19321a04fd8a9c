use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::detection::domain::association::associate;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::identity_tracker::IdentityTracker;
use crate::identity::sample::Sample;
use crate::identity::track_buffer::{AppendOutcome, BufferError, ClosedIdentity, TrackBuffer};
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;

use super::capture_config::CaptureConfig;
use super::export_dispatcher::ExportDispatcher;
use super::pipeline_logger::PipelineLogger;

pub type ProgressFn = Box<dyn Fn(usize, usize) -> bool + Send>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open {path}: {message}")]
    SourceOpen { path: PathBuf, message: String },
    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("capture already executed")]
    AlreadyExecuted,
}

/// Counters for one finished capture run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub frames_read: usize,
    pub frames_processed: usize,
    /// Sampled frames whose detection or tracking failed.
    pub frames_failed: usize,
    pub identities_closed: usize,
    pub degenerate: usize,
    pub exported: usize,
    pub export_failures: usize,
    pub cancelled: bool,
}

/// Drives read → detect → track → associate → buffer → export for one stream.
///
/// Every sampled frame is handled to completion before the next is read, so
/// closure decisions always see that frame's live-track set. Single-use:
/// `execute` consumes the owned components.
pub struct CaptureFacesUseCase {
    reader: Option<Box<dyn VideoReader>>,
    detector: Option<Box<dyn FaceDetector>>,
    tracker: Option<Box<dyn IdentityTracker>>,
    dispatcher: Option<Box<dyn ExportDispatcher>>,
    logger: Box<dyn PipelineLogger>,
    config: CaptureConfig,
    on_progress: Option<ProgressFn>,
    cancelled: Arc<AtomicBool>,
}

impl CaptureFacesUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        tracker: Box<dyn IdentityTracker>,
        dispatcher: Box<dyn ExportDispatcher>,
        logger: Box<dyn PipelineLogger>,
        config: CaptureConfig,
        on_progress: Option<ProgressFn>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            detector: Some(detector),
            tracker: Some(tracker),
            dispatcher: Some(dispatcher),
            logger,
            config,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn execute(&mut self, input_path: &Path) -> Result<CaptureSummary, CaptureError> {
        self.config.validate()?;
        let (Some(mut reader), Some(mut detector), Some(mut tracker), Some(mut dispatcher)) = (
            self.reader.take(),
            self.detector.take(),
            self.tracker.take(),
            self.dispatcher.take(),
        ) else {
            return Err(CaptureError::AlreadyExecuted);
        };

        let metadata = reader
            .open(input_path)
            .map_err(|e| CaptureError::SourceOpen {
                path: input_path.to_path_buf(),
                message: e.to_string(),
            })?;
        self.logger.info(&format!(
            "Capturing from {} ({metadata}, stride {}, {} samples per identity)",
            input_path.display(),
            self.config.frame_stride,
            self.config.samples_per_identity
        ));

        let mut buffer = TrackBuffer::new(self.config.samples_per_identity)?;
        let mut summary = CaptureSummary::default();
        let total = metadata.total_frames;
        let on_progress = self.on_progress.take();

        for frame_result in reader.frames() {
            if self.cancelled.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }

            let frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Frame read failed, ending stream: {e}");
                    break;
                }
            };
            summary.frames_read += 1;
            let position = summary.frames_read;

            if self.config.is_sampled(position) {
                summary.frames_processed += 1;
                match process_frame(
                    &frame,
                    &mut *detector,
                    &mut *tracker,
                    &mut buffer,
                    &mut *self.logger,
                ) {
                    Ok(closed) => {
                        dispatch_all(closed, &mut *dispatcher, &mut summary);
                    }
                    Err(e) => {
                        summary.frames_failed += 1;
                        log::warn!("Skipping frame {}: {e}", frame.index());
                    }
                }
                self.logger
                    .metric("open_identities", buffer.open_ids().len() as f64);
            }

            self.logger.progress(position, total);
            if let Some(ref callback) = on_progress {
                if !callback(position, total) {
                    self.cancelled.store(true, Ordering::Relaxed);
                    summary.cancelled = true;
                    break;
                }
            }
        }
        reader.close();

        let remaining = buffer.flush();
        if !remaining.is_empty() {
            log::debug!("Flushing {} open identities at stream end", remaining.len());
        }
        dispatch_all(remaining, &mut *dispatcher, &mut summary);

        let stats = dispatcher.finish();
        summary.exported = stats.exported;
        summary.export_failures = stats.failed;
        summary.degenerate = stats.degenerate;

        self.logger.summary();
        Ok(summary)
    }
}

/// Runs one sampled frame through detection, tracking, association and the
/// buffer. Nothing is appended unless both detection and tracking succeed.
fn process_frame(
    frame: &Frame,
    detector: &mut dyn FaceDetector,
    tracker: &mut dyn IdentityTracker,
    buffer: &mut TrackBuffer,
    logger: &mut dyn PipelineLogger,
) -> Result<Vec<ClosedIdentity>, Box<dyn std::error::Error>> {
    let t0 = Instant::now();
    let detections = detector.detect(frame)?;
    logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

    let t0 = Instant::now();
    let tracks = tracker.update(&detections, frame)?;
    logger.timing("track", t0.elapsed().as_secs_f64() * 1000.0);
    logger.metric("detections", detections.len() as f64);
    logger.metric("tracks", tracks.len() as f64);

    for association in associate(&detections, &tracks) {
        let sample = Sample::new(association.confidence, frame.crop(&association.bbox));
        if let AppendOutcome::QuotaFull = buffer.append(association.track_id, sample) {
            log::debug!(
                "Identity {} already holds a full quota; sample dropped",
                association.track_id
            );
        }
    }

    let live_ids: HashSet<u32> = tracks.iter().map(|t| t.id).collect();
    Ok(buffer.check_closures(&live_ids))
}

fn dispatch_all(
    closed: Vec<ClosedIdentity>,
    dispatcher: &mut dyn ExportDispatcher,
    summary: &mut CaptureSummary,
) {
    for identity in closed {
        log::debug!(
            "Closed identity {} ({:?}, {} samples)",
            identity.track_id,
            identity.reason,
            identity.sample_count
        );
        summary.identities_closed += 1;
        dispatcher.dispatch(identity);
    }
}
