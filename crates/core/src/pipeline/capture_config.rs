use crate::shared::constants::{DEFAULT_FRAME_STRIDE, DEFAULT_SAMPLES_PER_IDENTITY};

use super::capture_faces_use_case::CaptureError;

/// Tunables for one capture run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Frame `n` (1-based) is processed iff `n % frame_stride == 0`.
    pub frame_stride: usize,
    /// Buffered samples that force an identity to close.
    pub samples_per_identity: usize,
}

impl CaptureConfig {
    pub fn new(frame_stride: usize, samples_per_identity: usize) -> Result<Self, CaptureError> {
        let config = Self {
            frame_stride,
            samples_per_identity,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.frame_stride == 0 {
            return Err(CaptureError::InvalidConfig(
                "frame stride must be at least 1".into(),
            ));
        }
        if self.samples_per_identity == 0 {
            return Err(CaptureError::InvalidConfig(
                "samples per identity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Whether the frame at 1-based `position` goes through detection.
    pub fn is_sampled(&self, position: usize) -> bool {
        position % self.frame_stride == 0
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_stride: DEFAULT_FRAME_STRIDE,
            samples_per_identity: DEFAULT_SAMPLES_PER_IDENTITY,
        }
    }
}
