pub mod descriptor_backend;
pub mod export_error;
pub mod face_embedder;
pub mod face_exporter;
pub mod snapshot;
