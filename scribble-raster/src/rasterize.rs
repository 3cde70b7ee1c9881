//! Stroke normalization: paths in canvas coordinates to a centred,
//! scale-normalized 28×28 image.
//!
//! ```text
//! canvas paths ──clamp──► bbox ──fit + centre──► 280×280 brush ──bilinear──► 28×28
//!                                                      ▲                            │
//!                                                      └──── centre-of-mass shift ◄─┘
//! ```

use scribble_core::{CanvasSize, Path, Point};
use serde::{Deserialize, Serialize};

use crate::buffer::RasterBuffer;
use crate::image::{RasterImage, IMAGE_SIZE};

/// Bounding-box dimensions below this are treated as zero.
const DEGENERATE_EXTENT: f32 = 1e-3;

/// Centre of the output image in pixel coordinates.
#[allow(clippy::cast_precision_loss)]
const IMAGE_CENTRE: f32 = (IMAGE_SIZE as f32 - 1.0) / 2.0;

/// Centre-of-mass corrections below this (working px) are skipped.
const MIN_SHIFT: f32 = 0.5;

/// Tuning for the rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Side of the working buffer; a multiple of the output side.
    pub working_size: usize,
    /// Empty margin around the drawing in the working buffer.
    pub padding: f32,
    /// Extra shrink applied on top of the fit so strokes never touch the margin.
    pub safety_factor: f32,
    /// Stroke width as painted on the canvas, in canvas units.
    pub source_stroke_width: f32,
    /// Smallest brush radius in working pixels.
    pub min_radius: f32,
    /// Largest brush radius in working pixels.
    pub max_radius: f32,
    /// Distance between brush stamps along a segment, in working pixels.
    pub stamp_spacing: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            working_size: IMAGE_SIZE * 10,
            padding: 40.0,
            safety_factor: 0.9,
            source_stroke_width: 12.0,
            min_radius: 9.0,
            max_radius: 16.0,
            stamp_spacing: 1.0,
        }
    }
}

impl RasterConfig {
    /// Side of the square the drawing is fitted into.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn draw_size(&self) -> f32 {
        (self.working_size as f32 - 2.0 * self.padding).max(1.0)
    }
}

/// Turns a set of paths into a [`RasterImage`].
///
/// Pure: identical input always yields a bit-identical image.
#[derive(Debug, Clone, Default)]
pub struct Rasterizer {
    config: RasterConfig,
}

impl Rasterizer {
    /// Rasterizer with default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterizer with custom tuning.
    #[must_use]
    pub const fn with_config(config: RasterConfig) -> Self {
        Self { config }
    }

    /// The active tuning.
    #[must_use]
    pub const fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Rasterize `paths` drawn on a canvas of the given size.
    ///
    /// Points outside the canvas are clamped to its edge. An empty input (or
    /// one with no points) produces a blank image. The bounding box is fitted
    /// and centred first; the drawing is then shifted so its ink centroid
    /// sits on the image centre, limited by the margin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rasterize(&self, paths: &[Path], canvas: CanvasSize) -> RasterImage {
        let strokes: Vec<Vec<Point>> = paths
            .iter()
            .map(|p| p.points().iter().map(|pt| clamp_to(*pt, canvas)).collect())
            .filter(|pts: &Vec<Point>| !pts.is_empty())
            .collect();

        let Some(bounds) = Bounds::of(strokes.iter().flatten()) else {
            tracing::debug!("Rasterizing empty input to a blank image");
            return RasterImage::blank();
        };

        let scale = self.fit_scale(&bounds, canvas);
        let working = self.config.working_size as f32;
        let extent_x = bounds.width() * scale;
        let extent_y = bounds.height() * scale;
        let offset = ((working - extent_x) / 2.0, (working - extent_y) / 2.0);
        let radius = (self.config.source_stroke_width * scale / 2.0)
            .clamp(self.config.min_radius, self.config.max_radius);

        let boxed = self.paint(&strokes, &bounds, scale, offset, radius);
        let Some((cx, cy)) = boxed.centroid() else {
            return boxed;
        };

        // Move the centre of mass onto the image centre, as far as the
        // margin allows without pushing ink out of the frame.
        let per_pixel = working / IMAGE_SIZE as f32;
        let limit_x = (offset.0 - radius).max(0.0);
        let limit_y = (offset.1 - radius).max(0.0);
        let shift_x = ((IMAGE_CENTRE - cx) * per_pixel).clamp(-limit_x, limit_x);
        let shift_y = ((IMAGE_CENTRE - cy) * per_pixel).clamp(-limit_y, limit_y);
        if shift_x.abs() < MIN_SHIFT && shift_y.abs() < MIN_SHIFT {
            return boxed;
        }
        tracing::trace!("Centre-of-mass shift ({shift_x:.1}, {shift_y:.1}) working px");
        self.paint(
            &strokes,
            &bounds,
            scale,
            (offset.0 + shift_x, offset.1 + shift_y),
            radius,
        )
    }

    /// Brush `strokes` into the working buffer and downsample.
    fn paint(
        &self,
        strokes: &[Vec<Point>],
        bounds: &Bounds,
        scale: f32,
        offset: (f32, f32),
        radius: f32,
    ) -> RasterImage {
        let to_working = |p: &Point| {
            (
                (p.x - bounds.min_x) * scale + offset.0,
                (p.y - bounds.min_y) * scale + offset.1,
            )
        };

        let mut buffer = RasterBuffer::new(self.config.working_size, self.config.working_size);
        for stroke in strokes {
            let mapped: Vec<(f32, f32)> = stroke.iter().map(to_working).collect();
            if let [only] = mapped.as_slice() {
                buffer.stamp_disk(only.0, only.1, radius, 1.0);
                continue;
            }
            for pair in mapped.windows(2) {
                buffer.draw_segment(pair[0], pair[1], radius, self.config.stamp_spacing, 1.0);
            }
        }

        let small = buffer.downsample_bilinear(IMAGE_SIZE, IMAGE_SIZE);
        RasterImage::from_pixels(small.into_data()).unwrap_or_default()
    }

    /// Uniform scale mapping the bounding box into the draw area.
    ///
    /// A zero-width (or zero-height) box is fitted on its other dimension;
    /// a single dot is scaled relative to the canvas.
    fn fit_scale(&self, bounds: &Bounds, canvas: CanvasSize) -> f32 {
        let target = self.config.draw_size();
        let fit = |extent: f32| (extent > DEGENERATE_EXTENT).then(|| target / extent);

        let scale = match (fit(bounds.width()), fit(bounds.height())) {
            (Some(sx), Some(sy)) => sx.min(sy),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => {
                let side = canvas.width.max(canvas.height);
                if side > DEGENERATE_EXTENT {
                    target / side
                } else {
                    1.0
                }
            }
        };
        scale * self.config.safety_factor
    }
}

/// Rasterize with default tuning.
#[must_use]
pub fn rasterize(paths: &[Path], canvas_width: f32, canvas_height: f32) -> RasterImage {
    Rasterizer::new().rasterize(paths, CanvasSize::new(canvas_width, canvas_height))
}

fn clamp_to(point: Point, canvas: CanvasSize) -> Point {
    if !canvas.is_valid() {
        return point;
    }
    Point::new(
        point.x.clamp(0.0, canvas.width),
        point.y.clamp(0.0, canvas.height),
    )
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    fn of<'a>(points: impl Iterator<Item = &'a Point>) -> Option<Self> {
        points.fold(None, |acc: Option<Self>, p| {
            Some(match acc {
                None => Self {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                Some(b) => Self {
                    min_x: b.min_x.min(p.x),
                    min_y: b.min_y.min(p.y),
                    max_x: b.max_x.max(p.x),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
    }

    fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}
