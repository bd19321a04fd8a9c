pub mod http_descriptor_backend;
pub mod onnx_face_embedder;
pub mod snapshot_exporter;
