pub mod detection;
pub mod export;
pub mod identity;
pub mod pipeline;
pub mod shared;
pub mod video;
