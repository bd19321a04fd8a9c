use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use facesnap_core::shared::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_FRAME_STRIDE, DEFAULT_SAMPLES_PER_IDENTITY, DEFAULT_SNAPSHOT_DIR,
    DETECTION_CONFIDENCE, NMS_IOU_THRESHOLD, NMS_SCORE_THRESHOLD, TRACKER_MAX_LOST,
    TRACKER_MIN_HITS,
};

/// Persistent defaults, read from `settings.json`. Missing keys fall back to
/// the built-in defaults; command-line flags override both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub frame_stride: usize,
    pub samples_per_identity: usize,
    pub confidence: f64,
    pub nms_score: f64,
    pub nms_iou: f64,
    pub min_hits: usize,
    pub max_lost: usize,
    pub backend_url: String,
    pub backend_timeout_secs: u64,
    pub snapshot_dir: PathBuf,
    /// 0 exports on the capture thread.
    pub export_workers: usize,
    pub model_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_stride: DEFAULT_FRAME_STRIDE,
            samples_per_identity: DEFAULT_SAMPLES_PER_IDENTITY,
            confidence: DETECTION_CONFIDENCE,
            nms_score: NMS_SCORE_THRESHOLD,
            nms_iou: NMS_IOU_THRESHOLD,
            min_hits: TRACKER_MIN_HITS,
            max_lost: TRACKER_MAX_LOST,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_timeout_secs: 10,
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            export_workers: 1,
            model_dir: None,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceSnap").join("settings.json"))
    }

    /// Loads `explicit` if given (it must exist), else the per-user settings
    /// file if present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let json = fs::read_to_string(&path)
            .map_err(|e| format!("Cannot read settings {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid settings {}: {e}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
