use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapgateError {
    /// A collaborator handed us structurally broken input (non-finite
    /// numbers, zero fps, ...). Always a hard failure.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    FileNotFound(PathBuf),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("ffprobe failed: {0}")]
    Ffprobe(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CapgateError>;
