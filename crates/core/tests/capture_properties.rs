//! End-to-end checks of capture behaviour through the public API: real
//! track buffer, real snapshot exporter writing JPEGs, scripted detector
//! and tracker, recording descriptor backend.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use facesnap_core::detection::domain::association::associate;
use facesnap_core::detection::domain::detection::Detection;
use facesnap_core::detection::domain::face_detector::FaceDetector;
use facesnap_core::detection::domain::identity_tracker::IdentityTracker;
use facesnap_core::detection::domain::track::Track;
use facesnap_core::export::domain::descriptor_backend::{DescriptorBackend, DescriptorRecord};
use facesnap_core::export::domain::export_error::ExportError;
use facesnap_core::export::domain::face_embedder::FaceEmbedder;
use facesnap_core::export::infrastructure::snapshot_exporter::SnapshotExporter;
use facesnap_core::identity::sample::Sample;
use facesnap_core::identity::track_buffer::{
    select_best, AppendOutcome, ClosureOutcome, TrackBuffer,
};
use facesnap_core::pipeline::capture_config::CaptureConfig;
use facesnap_core::pipeline::capture_faces_use_case::{CaptureFacesUseCase, CaptureSummary};
use facesnap_core::pipeline::export_dispatcher::{ExportDispatcher, InlineExportDispatcher};
use facesnap_core::pipeline::infrastructure::threaded_export_dispatcher::ThreadedExportDispatcher;
use facesnap_core::pipeline::pipeline_logger::NullPipelineLogger;
use facesnap_core::shared::bounding_box::BoundingBox;
use facesnap_core::shared::constants::DESCRIPTOR_LEN;
use facesnap_core::shared::frame::Frame;
use facesnap_core::shared::video_metadata::VideoMetadata;
use facesnap_core::video::domain::video_reader::VideoReader;
use facesnap_core::video::infrastructure::image_file_writer::ImageFileWriter;

const SIZE: u32 = 100;

struct GrayReader {
    count: usize,
}

impl VideoReader for GrayReader {
    fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        Ok(VideoMetadata {
            width: SIZE,
            height: SIZE,
            fps: 25.0,
            total_frames: self.count,
            codec: "gray".into(),
            source_path: None,
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new((0..self.count).map(|i| {
            Ok(Frame::new(
                vec![128u8; (SIZE * SIZE * 3) as usize],
                SIZE,
                SIZE,
                3,
                i,
            ))
        }))
    }

    fn close(&mut self) {}
}

/// Scripted detections keyed by frame index.
#[derive(Default)]
struct ScriptedDetector {
    script: HashMap<usize, Vec<Detection>>,
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self
            .script
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}

/// Confirms every detection at once, using its x coordinate as the id.
/// Fails on the listed frame indices.
#[derive(Default)]
struct EchoTracker {
    fail_on: HashSet<usize>,
}

impl IdentityTracker for EchoTracker {
    fn update(
        &mut self,
        detections: &[Detection],
        frame: &Frame,
    ) -> Result<Vec<Track>, Box<dyn std::error::Error>> {
        if self.fail_on.contains(&frame.index()) {
            return Err("tracker state lost".into());
        }
        Ok(detections
            .iter()
            .map(|d| Track {
                id: d.bbox.x as u32,
                bbox: d.bbox,
                confirmed: true,
            })
            .collect())
    }
}

struct ConstantEmbedder;

impl FaceEmbedder for ConstantEmbedder {
    fn embed(&self, _crop: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        Ok(vec![0.25; DESCRIPTOR_LEN])
    }
}

/// Records every submission; rejects records whose path contains `reject`.
#[derive(Clone, Default)]
struct RecordingBackend {
    records: Arc<Mutex<Vec<DescriptorRecord>>>,
    reject: Option<&'static str>,
}

impl DescriptorBackend for RecordingBackend {
    fn submit(&self, record: &DescriptorRecord) -> Result<(), ExportError> {
        self.records.lock().unwrap().push(record.clone());
        match self.reject {
            Some(pattern) if record.image_path.contains(pattern) => {
                Err(ExportError::BackendRejected {
                    status: 500,
                    body: "database down".into(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn face(id: u32, confidence: f64) -> Detection {
    Detection::new(BoundingBox::new(id as i32, 10, 20, 20), confidence)
}

fn run(
    frames: usize,
    detector: ScriptedDetector,
    tracker: EchoTracker,
    dispatcher: Box<dyn ExportDispatcher>,
    samples_per_identity: usize,
) -> CaptureSummary {
    let mut uc = CaptureFacesUseCase::new(
        Box::new(GrayReader { count: frames }),
        Box::new(detector),
        Box::new(tracker),
        dispatcher,
        Box::new(NullPipelineLogger),
        CaptureConfig::new(1, samples_per_identity).unwrap(),
        None,
        None,
    );
    uc.execute(Path::new("stream")).unwrap()
}

fn exporter(dir: &Path, backend: RecordingBackend) -> Arc<SnapshotExporter> {
    Arc::new(SnapshotExporter::new(
        dir,
        Box::new(ImageFileWriter::default()),
        Box::new(ConstantEmbedder),
        Box::new(backend),
    ))
}

#[test]
fn each_identity_yields_one_snapshot_and_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let backend = RecordingBackend::default();
    let mut detector = ScriptedDetector::default();
    detector.script.insert(0, vec![face(10, 0.7), face(50, 0.95)]);
    detector.script.insert(1, vec![face(10, 0.9), face(50, 0.8)]);
    detector.script.insert(2, vec![face(10, 0.8)]);
    // 50 departs at frame 2 and comes back later under the same id
    detector.script.insert(4, vec![face(50, 0.99)]);

    let summary = run(
        6,
        detector,
        EchoTracker::default(),
        Box::new(InlineExportDispatcher::new(exporter(dir.path(), backend.clone()))),
        5,
    );

    assert_eq!(summary.identities_closed, 2);
    assert_eq!(summary.exported, 2);

    let records = backend.records.lock().unwrap();
    let paths: Vec<&str> = records.iter().map(|r| r.image_path.as_str()).collect();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("face_50_confidence_0.95.jpg"));
    assert!(paths[1].ends_with("face_10_confidence_0.90.jpg"));
    for record in records.iter() {
        assert!(Path::new(&record.image_path).is_absolute());
        assert!(Path::new(&record.image_path).exists());
        assert_eq!(record.embeddings.len(), DESCRIPTOR_LEN);
    }
}

#[test]
fn rejected_export_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let backend = RecordingBackend {
        reject: Some("face_30_"),
        ..RecordingBackend::default()
    };
    let mut detector = ScriptedDetector::default();
    for i in 0..8 {
        // 30 departs on odd frames and returns on even ones
        if i % 2 == 0 {
            detector.script.insert(i, vec![face(30, 0.8)]);
        }
    }

    let summary = run(
        8,
        detector,
        EchoTracker::default(),
        Box::new(ThreadedExportDispatcher::new(exporter(dir.path(), backend.clone()), 2)),
        5,
    );

    assert_eq!(backend.records.lock().unwrap().len(), 1);
    assert_eq!(summary.identities_closed, 1);
    assert_eq!(summary.export_failures, 1);
    assert_eq!(summary.exported, 0);
}

#[test]
fn tracker_failure_neither_loses_samples_nor_closes_identities() {
    let dir = tempfile::tempdir().unwrap();
    let backend = RecordingBackend::default();
    let mut detector = ScriptedDetector::default();
    detector.script.insert(0, vec![face(20, 0.7)]);
    detector.script.insert(1, vec![face(20, 0.99)]);
    detector.script.insert(2, vec![face(20, 0.75)]);
    let tracker = EchoTracker {
        fail_on: HashSet::from([1]),
    };

    let summary = run(
        3,
        detector,
        tracker,
        Box::new(InlineExportDispatcher::new(exporter(dir.path(), backend.clone()))),
        5,
    );

    assert_eq!(summary.frames_failed, 1);
    assert_eq!(summary.identities_closed, 1);
    let records = backend.records.lock().unwrap();
    assert!(records[0].image_path.ends_with("face_20_confidence_0.75.jpg"));
}

#[test]
fn off_frame_identity_is_closed_without_backend_call() {
    let dir = tempfile::tempdir().unwrap();
    let backend = RecordingBackend::default();
    let mut detector = ScriptedDetector::default();
    detector.script.insert(0, vec![face(200, 0.9)]);

    let summary = run(
        2,
        detector,
        EchoTracker::default(),
        Box::new(InlineExportDispatcher::new(exporter(dir.path(), backend.clone()))),
        5,
    );

    assert_eq!(summary.identities_closed, 1);
    assert_eq!(summary.degenerate, 1);
    assert!(backend.records.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn buffer_stays_bounded_and_never_reopens_closed_ids() {
    let quota = 3;
    let mut buffer = TrackBuffer::new(quota).unwrap();
    let mut closed_so_far: HashSet<u32> = HashSet::new();
    let mut seed: u32 = 12345;
    let mut next = || {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (seed >> 16) % 6
    };

    for frame in 0..200 {
        let live: HashSet<u32> = (0..3).map(|_| next() + 1).collect();
        for &id in &live {
            let crop = Frame::new(vec![0u8; 12], 2, 2, 3, frame);
            let outcome = buffer.append(id, Sample::new(0.7, crop));
            if closed_so_far.contains(&id) {
                assert_eq!(outcome, AppendOutcome::AlreadyExported);
            }
            assert!(buffer.sample_count(id) <= quota);
        }

        for closed in buffer.check_closures(&live) {
            assert!(closed.sample_count >= 1 && closed.sample_count <= quota);
            assert!(closed_so_far.insert(closed.track_id), "closed twice");
            assert!(buffer.is_exported(closed.track_id));
        }
        for id in buffer.open_ids() {
            assert!(buffer.sample_count(id) < quota);
            assert!(!closed_so_far.contains(&id));
        }
    }

    for closed in buffer.flush() {
        assert!(closed_so_far.insert(closed.track_id), "closed twice");
    }
    assert!(buffer.open_ids().is_empty());
    assert_eq!(buffer.exported_count(), closed_so_far.len());
}

#[test]
fn equal_confidence_keeps_earliest_sample() {
    let samples: Vec<Sample> = [(0.7, 0), (0.9, 1), (0.9, 2)]
        .into_iter()
        .map(|(c, i)| Sample::new(c, Frame::new(vec![0u8; 3], 1, 1, 3, i)))
        .collect();
    assert_eq!(select_best(samples).unwrap().frame_index(), 1);

    let mut buffer = TrackBuffer::new(3).unwrap();
    for (c, i) in [(0.9, 4), (0.9, 5), (0.9, 6)] {
        buffer.append(7, Sample::new(c, Frame::new(vec![0u8; 3], 1, 1, 3, i)));
    }
    let closed = buffer.check_closures(&HashSet::from([7]));
    match &closed[0].outcome {
        ClosureOutcome::Selected(sample) => assert_eq!(sample.frame_index(), 4),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn touching_boxes_associate() {
    let detections = vec![Detection::new(BoundingBox::new(20, 0, 10, 10), 0.8)];
    let tracks = vec![Track {
        id: 1,
        bbox: BoundingBox::new(0, 0, 20, 10),
        confirmed: true,
    }];
    let associations = associate(&detections, &tracks);
    assert_eq!(associations.len(), 1);
    assert_eq!(associations[0].track_id, 1);
}
