//! Rasterizer error types.

use thiserror::Error;

/// Result type for rasterizer operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors that can occur around raster images.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Pixel data does not match the fixed image size.
    #[error("Invalid image dimensions: expected {expected} pixels, got {actual}")]
    InvalidDimensions {
        /// Required pixel count.
        expected: usize,
        /// Provided pixel count.
        actual: usize,
    },

    /// Encoding the image failed.
    #[error("Image export failed: {0}")]
    Export(String),

    /// Writing the image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
