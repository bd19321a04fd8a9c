mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facesnap_core::detection::domain::face_detector::FaceDetector;
use facesnap_core::detection::infrastructure::bytetrack_tracker::ByteTracker;
use facesnap_core::detection::infrastructure::model_resolver;
use facesnap_core::detection::infrastructure::onnx_yolo_detector::{
    DetectionThresholds, OnnxYoloDetector,
};
use facesnap_core::export::domain::face_exporter::FaceExporter;
use facesnap_core::export::infrastructure::http_descriptor_backend::HttpDescriptorBackend;
use facesnap_core::export::infrastructure::onnx_face_embedder::OnnxFaceEmbedder;
use facesnap_core::export::infrastructure::snapshot_exporter::SnapshotExporter;
use facesnap_core::pipeline::capture_config::CaptureConfig;
use facesnap_core::pipeline::capture_faces_use_case::{CaptureFacesUseCase, CaptureSummary};
use facesnap_core::pipeline::export_dispatcher::{ExportDispatcher, InlineExportDispatcher};
use facesnap_core::pipeline::infrastructure::threaded_export_dispatcher::ThreadedExportDispatcher;
use facesnap_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facesnap_core::shared::constants::{
    EMBEDDING_MODEL_NAME, SNAPSHOT_JPEG_QUALITY, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facesnap_core::video::domain::video_reader::VideoReader;
use facesnap_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facesnap_core::video::infrastructure::image_file_writer::ImageFileWriter;
use facesnap_core::video::infrastructure::image_sequence_reader::{
    is_image_file, ImageSequenceReader,
};

use settings::Settings;

/// Track faces in a video and export one best snapshot and descriptor per person.
#[derive(Parser, Debug)]
#[command(name = "facesnap")]
struct Cli {
    /// Input video file, image, or directory of images.
    input: PathBuf,

    /// Settings file (default: <config dir>/FaceSnap/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run detection on every Nth frame (1 = every frame).
    #[arg(long)]
    frame_stride: Option<usize>,

    /// Samples buffered per identity before its best one is exported.
    #[arg(long)]
    samples_per_identity: Option<usize>,

    /// Minimum detector confidence (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// NMS score threshold (0.0-1.0).
    #[arg(long)]
    nms_score: Option<f64>,

    /// NMS IoU threshold (0.0-1.0).
    #[arg(long)]
    nms_iou: Option<f64>,

    /// Descriptor backend endpoint.
    #[arg(long)]
    backend_url: Option<String>,

    /// Backend request timeout in seconds.
    #[arg(long)]
    backend_timeout: Option<u64>,

    /// Directory for snapshot JPEGs.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Export worker threads (0 = export on the capture thread).
    #[arg(long)]
    export_workers: Option<usize>,

    /// Extra directory searched for model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Face detector ONNX model (skips model resolution).
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Face embedding ONNX model (skips model resolution).
    #[arg(long)]
    embedder_model: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = apply_overrides(Settings::load(cli.config.as_deref())?, &cli);
    validate(&cli.input, &settings)?;

    let config = CaptureConfig::new(settings.frame_stride, settings.samples_per_identity)?;
    let detector = build_detector(&cli, &settings)?;
    let exporter = build_exporter(&cli, &settings)?;
    let dispatcher: Box<dyn ExportDispatcher> = if settings.export_workers == 0 {
        Box::new(InlineExportDispatcher::new(exporter))
    } else {
        Box::new(ThreadedExportDispatcher::new(exporter, settings.export_workers))
    };

    let progress: Box<dyn Fn(usize, usize) -> bool + Send> =
        Box::new(|current: usize, total: usize| {
            if total > 0 {
                eprint!("\rProcessing frame {current}/{total}");
            } else {
                eprint!("\rProcessing frame {current}");
            }
            true
        });

    let mut use_case = CaptureFacesUseCase::new(
        open_reader(&cli.input),
        detector,
        Box::new(ByteTracker::new(settings.min_hits, settings.max_lost)),
        dispatcher,
        Box::new(StdoutPipelineLogger::without_progress()),
        config,
        Some(progress),
        None,
    );
    let summary = use_case.execute(&cli.input)?;
    eprintln!();

    report(&summary, &settings.snapshot_dir);
    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(v) = cli.frame_stride {
        settings.frame_stride = v;
    }
    if let Some(v) = cli.samples_per_identity {
        settings.samples_per_identity = v;
    }
    if let Some(v) = cli.confidence {
        settings.confidence = v;
    }
    if let Some(v) = cli.nms_score {
        settings.nms_score = v;
    }
    if let Some(v) = cli.nms_iou {
        settings.nms_iou = v;
    }
    if let Some(ref v) = cli.backend_url {
        settings.backend_url = v.clone();
    }
    if let Some(v) = cli.backend_timeout {
        settings.backend_timeout_secs = v;
    }
    if let Some(ref v) = cli.snapshot_dir {
        settings.snapshot_dir = v.clone();
    }
    if let Some(v) = cli.export_workers {
        settings.export_workers = v;
    }
    if cli.model_dir.is_some() {
        settings.model_dir = cli.model_dir.clone();
    }
    settings
}

fn validate(input: &Path, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input not found: {}", input.display()).into());
    }
    if settings.frame_stride == 0 {
        return Err("Frame stride must be at least 1".into());
    }
    if settings.samples_per_identity == 0 {
        return Err("Samples per identity must be at least 1".into());
    }
    for (name, value) in [
        ("Confidence", settings.confidence),
        ("NMS score threshold", settings.nms_score),
        ("NMS IoU threshold", settings.nms_iou),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{name} must be between 0.0 and 1.0, got {value}").into());
        }
    }
    if !settings.backend_url.starts_with("http://") && !settings.backend_url.starts_with("https://")
    {
        return Err(format!(
            "Backend URL must start with http:// or https://, got '{}'",
            settings.backend_url
        )
        .into());
    }
    if settings.backend_timeout_secs == 0 {
        return Err("Backend timeout must be at least 1 second".into());
    }
    Ok(())
}

fn build_detector(
    cli: &Cli,
    settings: &Settings,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match cli.detector_model {
        Some(ref path) => path.clone(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = model_resolver::resolve(
                YOLO_MODEL_NAME,
                Some(YOLO_MODEL_URL),
                settings.model_dir.as_deref(),
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let thresholds = DetectionThresholds {
        confidence: settings.confidence,
        nms_score: settings.nms_score,
        nms_iou: settings.nms_iou,
    };
    Ok(Box::new(OnnxYoloDetector::new(&model_path, thresholds)?))
}

fn build_exporter(
    cli: &Cli,
    settings: &Settings,
) -> Result<Arc<dyn FaceExporter>, Box<dyn std::error::Error>> {
    let model_path = match cli.embedder_model {
        Some(ref path) => path.clone(),
        None => model_resolver::resolve(
            EMBEDDING_MODEL_NAME,
            None,
            settings.model_dir.as_deref(),
            None,
        )?,
    };

    let embedder = OnnxFaceEmbedder::new(&model_path)?;
    let backend = HttpDescriptorBackend::new(
        &settings.backend_url,
        Duration::from_secs(settings.backend_timeout_secs),
    )?;
    log::info!("Exporting descriptors to {}", backend.url());

    Ok(Arc::new(SnapshotExporter::new(
        &settings.snapshot_dir,
        Box::new(ImageFileWriter::new(SNAPSHOT_JPEG_QUALITY)),
        Box::new(embedder),
        Box::new(backend),
    )))
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if input.is_dir() || is_image_file(input) {
        Box::new(ImageSequenceReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn report(summary: &CaptureSummary, snapshot_dir: &Path) {
    if summary.cancelled {
        log::info!("Capture cancelled; open identities were flushed");
    }
    log::info!(
        "Read {} frames, processed {} ({} failed)",
        summary.frames_read,
        summary.frames_processed,
        summary.frames_failed
    );
    log::info!(
        "Closed {} identities: {} exported to {}, {} failed, {} without a usable crop",
        summary.identities_closed,
        summary.exported,
        snapshot_dir.display(),
        summary.export_failures,
        summary.degenerate
    );
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
