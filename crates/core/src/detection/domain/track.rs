use crate::shared::bounding_box::BoundingBox;

/// A tracker-assigned identity and its current box.
///
/// `confirmed` is false until the tracker has seen enough consecutive
/// supporting detections; unconfirmed tracks never reach the track buffer
/// but still count as live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: u32,
    pub bbox: BoundingBox,
    pub confirmed: bool,
}
