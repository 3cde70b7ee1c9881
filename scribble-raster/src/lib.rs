//! # Scribble Raster
//!
//! Converts freehand stroke paths into the fixed 28×28 grayscale image the
//! digit classifier consumes.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Rasterizer                     │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ Normalize   │ Brush       │ Downsample      │
//! │ bbox, fit,  │ soft disks  │ bilinear        │
//! │ centre      │ at 280×280  │ to 28×28        │
//! └─────────────┴─────────────┴─────────────────┘
//! ```
//!
//! Ink is 1.0 on a 0.0 background. Output is deterministic for a given
//! input and configuration.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod error;
pub mod image;
pub mod rasterize;

pub use buffer::RasterBuffer;
pub use error::{RasterError, RasterResult};
pub use self::image::{RasterImage, IMAGE_SIZE, PIXEL_COUNT};
pub use rasterize::{rasterize, RasterConfig, Rasterizer};
