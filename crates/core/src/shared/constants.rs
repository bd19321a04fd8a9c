pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// 128-d FaceNet descriptor model. Not published anywhere; must be placed in
/// the model cache or passed explicitly.
pub const EMBEDDING_MODEL_NAME: &str = "facenet_128.onnx";

/// Raw detector candidates must score strictly above this to be kept.
pub const DETECTION_CONFIDENCE: f64 = 0.6;
/// NMS drops candidates scoring at or below this.
pub const NMS_SCORE_THRESHOLD: f64 = 0.5;
/// NMS suppresses boxes overlapping a kept box by more than this IoU.
pub const NMS_IOU_THRESHOLD: f64 = 0.4;

/// Consecutive matched frames before a track is confirmed.
pub const TRACKER_MIN_HITS: usize = 3;
/// Missed frames a confirmed track may coast before removal.
pub const TRACKER_MAX_LOST: usize = 5;

/// Process every Nth frame.
pub const DEFAULT_FRAME_STRIDE: usize = 2;
/// Samples buffered per identity before closure is forced.
pub const DEFAULT_SAMPLES_PER_IDENTITY: usize = 5;

pub const DESCRIPTOR_LEN: usize = 128;
pub const EMBEDDING_INPUT_SIZE: u32 = 160;

pub const SNAPSHOT_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_SNAPSHOT_DIR: &str = "data/faces";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/add";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
