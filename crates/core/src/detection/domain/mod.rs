pub mod association;
pub mod detection;
pub mod face_detector;
pub mod identity_tracker;
pub mod track;
