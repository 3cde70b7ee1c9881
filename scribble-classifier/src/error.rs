//! Classifier error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Errors that can occur while acquiring or running the digit model.
///
/// None of these reach the user: acquisition falls back to a synthesized
/// network and inference failures become a zeroed distribution.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model weights file does not exist.
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Weights could not be decoded into the network.
    #[error("Failed to load model record: {0}")]
    Record(String),

    /// Downloading weights failed.
    #[error("Model download failed: {0}")]
    Download(String),

    /// The forward pass failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        Self::Download(e.to_string())
    }
}

impl From<burn::record::RecorderError> for ClassifierError {
    fn from(e: burn::record::RecorderError) -> Self {
        Self::Record(e.to_string())
    }
}
