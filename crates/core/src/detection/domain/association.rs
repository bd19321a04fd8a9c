//! Recovers per-track detector confidence for the current frame.
//!
//! The tracker keeps identities but drops scores, so each confirmed track is
//! matched back to a detection by box overlap. The scan returns the *first*
//! overlapping detection in detector order, not the best-overlapping one;
//! with two detections touching the same track the attributed confidence
//! depends on detector ordering.

use crate::shared::bounding_box::BoundingBox;

use super::detection::Detection;
use super::track::Track;

/// A confirmed track paired with the confidence it earned this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Association {
    pub track_id: u32,
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// Matches every confirmed track to the first overlapping detection.
///
/// Unconfirmed tracks and tracks with no overlapping detection produce
/// nothing. Output follows track order.
pub fn associate(detections: &[Detection], tracks: &[Track]) -> Vec<Association> {
    tracks
        .iter()
        .filter(|t| t.confirmed)
        .filter_map(|track| {
            detections
                .iter()
                .find(|d| d.bbox.overlaps(&track.bbox))
                .map(|d| Association {
                    track_id: track.id,
                    bbox: track.bbox,
                    confidence: d.confidence,
                })
        })
        .collect()
}
