use std::path::PathBuf;

use thiserror::Error;

/// Why a single identity's export did not complete.
///
/// Every variant is terminal for that identity: the id is already marked
/// exported when the error surfaces, and nothing retries it.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("descriptor has {actual} values, expected {expected}")]
    InvalidDescriptor { expected: usize, actual: usize },
    #[error("descriptor backend unreachable: {0}")]
    BackendUnavailable(String),
    #[error("descriptor backend rejected record (HTTP {status}): {body}")]
    BackendRejected { status: u16, body: String },
    #[error("failed to write snapshot {path}: {message}")]
    Snapshot { path: PathBuf, message: String },
    #[error("embedding failed: {0}")]
    Embedding(String),
}
