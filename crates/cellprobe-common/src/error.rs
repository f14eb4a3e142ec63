//! Errors shared across cellprobe crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("invalid capture document: {0}")]
    InvalidCapture(#[from] serde_json::Error),
}
