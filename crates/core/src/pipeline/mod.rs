pub mod capture_config;
pub mod capture_faces_use_case;
pub mod export_dispatcher;
pub mod infrastructure;
pub mod pipeline_logger;
