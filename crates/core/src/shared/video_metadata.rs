use std::fmt;
use std::path::PathBuf;

/// What a frame source reports when opened.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// 0.0 for image sequences.
    pub fps: f64,
    /// 0 when the source cannot report a length.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl fmt::Display for VideoMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.fps > 0.0 {
            write!(f, " @ {:.2} fps", self.fps)?;
        }
        match self.total_frames {
            0 => write!(f, ", length unknown"),
            n => write!(f, ", {n} frames"),
        }
    }
}
