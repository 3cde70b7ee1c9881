//! The fixed-size classifier input image.

use serde::Serialize;

use crate::error::{RasterError, RasterResult};

/// Side length of a classifier input image.
pub const IMAGE_SIZE: usize = 28;

/// Pixel count of a classifier input image.
pub const PIXEL_COUNT: usize = IMAGE_SIZE * IMAGE_SIZE;

/// Ink below this intensity counts as background.
const INK_THRESHOLD: f32 = 1e-3;

/// A 28×28 grayscale image, row-major, ink = 1.0 on a 0.0 background.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterImage {
    pixels: Vec<f32>,
}

impl Default for RasterImage {
    fn default() -> Self {
        Self::blank()
    }
}

impl RasterImage {
    /// An all-background image.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            pixels: vec![0.0; PIXEL_COUNT],
        }
    }

    /// Wrap raw intensities, clamping each into `[0, 1]`.
    ///
    /// Non-finite values are treated as background.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::InvalidDimensions`] unless exactly
    /// [`PIXEL_COUNT`] values are given.
    pub fn from_pixels(mut pixels: Vec<f32>) -> RasterResult<Self> {
        if pixels.len() != PIXEL_COUNT {
            return Err(RasterError::InvalidDimensions {
                expected: PIXEL_COUNT,
                actual: pixels.len(),
            });
        }
        for p in &mut pixels {
            *p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
        }
        Ok(Self { pixels })
    }

    /// Row-major intensities.
    #[must_use]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Intensity at column `x`, row `y`; 0 outside the image.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x < IMAGE_SIZE && y < IMAGE_SIZE {
            self.pixels[y * IMAGE_SIZE + x]
        } else {
            0.0
        }
    }

    /// Whether no pixel carries ink.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p < INK_THRESHOLD)
    }

    /// Sum of all intensities.
    #[must_use]
    pub fn ink_mass(&self) -> f32 {
        self.pixels.iter().sum()
    }

    /// Centre of the inked pixels (unweighted), or `None` when blank.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<(f32, f32)> {
        let mut count = 0_usize;
        let (mut sx, mut sy) = (0.0_f32, 0.0_f32);
        for (i, &p) in self.pixels.iter().enumerate() {
            if p >= INK_THRESHOLD {
                sx += (i % IMAGE_SIZE) as f32;
                sy += (i / IMAGE_SIZE) as f32;
                count += 1;
            }
        }
        (count > 0).then(|| (sx / count as f32, sy / count as f32))
    }

    /// Text rendering for terminals: one character per pixel.
    #[must_use]
    pub fn to_ascii(&self) -> String {
        const RAMP: [char; 5] = [' ', '.', ':', '*', '#'];
        let mut out = String::with_capacity(PIXEL_COUNT + IMAGE_SIZE);
        for row in self.pixels.chunks_exact(IMAGE_SIZE) {
            for &p in row {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let level = ((p * 4.0).round() as usize).min(RAMP.len() - 1);
                out.push(RAMP[level]);
            }
            out.push('\n');
        }
        out
    }

    /// Convert to an 8-bit grayscale image.
    #[cfg(feature = "images")]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_gray_image(&self) -> image::GrayImage {
        let side = IMAGE_SIZE as u32;
        image::GrayImage::from_fn(side, side, |x, y| {
            let value = self.get(x as usize, y as usize);
            image::Luma([(value * 255.0).round() as u8])
        })
    }

    /// Encode as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Export`] if encoding fails.
    #[cfg(feature = "images")]
    pub fn to_png(&self) -> RasterResult<Vec<u8>> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.to_gray_image()
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| RasterError::Export(format!("PNG encoding failed: {e}")))?;
        Ok(buf.into_inner())
    }

    /// Write the image to `path` as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    #[cfg(feature = "images")]
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> RasterResult<()> {
        let bytes = self.to_png()?;
        std::fs::write(path.as_ref(), bytes)?;
        tracing::debug!("Wrote raster image to {}", path.as_ref().display());
        Ok(())
    }
}
