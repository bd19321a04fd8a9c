use crate::shared::frame::Frame;

use super::detection::Detection;
use super::track::Track;

/// Domain interface for multi-object identity tracking.
///
/// `update` returns every track the tracker still holds after consuming
/// this frame's detections, confirmed or not. That set is what the
/// pipeline treats as "live" when deciding which identities have left.
pub trait IdentityTracker: Send {
    fn update(
        &mut self,
        detections: &[Detection],
        frame: &Frame,
    ) -> Result<Vec<Track>, Box<dyn std::error::Error>>;
}
