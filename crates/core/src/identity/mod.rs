pub mod sample;
pub mod track_buffer;
