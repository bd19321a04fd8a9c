use crate::shared::frame::Frame;

/// One candidate face image for an identity, captured at one frame.
#[derive(Clone, Debug)]
pub struct Sample {
    pub confidence: f64,
    pub crop: Frame,
}

impl Sample {
    pub fn new(confidence: f64, crop: Frame) -> Self {
        Self { confidence, crop }
    }

    /// Index of the frame the crop was cut from.
    pub fn frame_index(&self) -> usize {
        self.crop.index()
    }

    /// A zero-area crop, typically from a track box lying outside the frame.
    pub fn is_degenerate(&self) -> bool {
        self.crop.is_empty()
    }
}
