//! High-resolution float raster buffer with soft-edged brush stamping.

/// A `width × height` grid of intensities in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl RasterBuffer {
    /// Create an all-zero buffer.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Raw intensities, row-major.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume the buffer, returning its intensities.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Intensity at `(x, y)`, or 0 outside the buffer.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x < self.width && y < self.height {
            self.data[y * self.width + x]
        } else {
            0.0
        }
    }

    /// Stamp an anti-aliased disk centred at `(cx, cy)`.
    ///
    /// Coverage is 1 inside `radius - 1`, falls off linearly to 0 at
    /// `radius`, and adds onto existing ink, saturating at 1.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn stamp_disk(&mut self, cx: f32, cy: f32, radius: f32, intensity: f32) {
        if self.width == 0 || self.height == 0 || radius <= 0.0 {
            return;
        }
        let reach = radius + 1.0;
        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let x0 = ((cx - reach).floor() as i64).clamp(0, max_x);
        let x1 = ((cx + reach).ceil() as i64).clamp(0, max_x);
        let y0 = ((cy - reach).floor() as i64).clamp(0, max_y);
        let y1 = ((cy + reach).ceil() as i64).clamp(0, max_y);

        for y in y0..=y1 {
            let py = y as f32 + 0.5;
            let row = y as usize * self.width;
            for x in x0..=x1 {
                let px = x as f32 + 0.5;
                let distance = (px - cx).hypot(py - cy);
                let coverage = (radius - distance).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    let pixel = &mut self.data[row + x as usize];
                    *pixel = (*pixel + coverage * intensity).min(1.0);
                }
            }
        }
    }

    /// Draw a segment as disks stamped every `spacing` pixels, endpoints
    /// included.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn draw_segment(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        radius: f32,
        spacing: f32,
        intensity: f32,
    ) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = dx.hypot(dy);
        let steps = if spacing > 0.0 {
            (length / spacing).ceil().max(1.0) as usize
        } else {
            1
        };

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp_disk(from.0 + dx * t, from.1 + dy * t, radius, intensity);
        }
    }

    /// Resample to `target_width × target_height` with bilinear
    /// interpolation, clamped to `[0, 1]`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn downsample_bilinear(&self, target_width: usize, target_height: usize) -> Self {
        let mut out = Self::new(target_width, target_height);
        if self.width == 0 || self.height == 0 || target_width == 0 || target_height == 0 {
            return out;
        }
        let scale_x = self.width as f32 / target_width as f32;
        let scale_y = self.height as f32 / target_height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        for oy in 0..target_height {
            let sy = ((oy as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
            let y0 = sy.floor() as usize;
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = sy - y0 as f32;

            for ox in 0..target_width {
                let sx = ((ox as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
                let x0 = sx.floor() as usize;
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = sx - x0 as f32;

                let top = self.get(x0, y0) * (1.0 - fx) + self.get(x1, y0) * fx;
                let bottom = self.get(x0, y1) * (1.0 - fx) + self.get(x1, y1) * fx;
                let value = top * (1.0 - fy) + bottom * fy;
                out.data[oy * target_width + ox] = value.clamp(0.0, 1.0);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_blank() {
        let buffer = RasterBuffer::new(4, 3);
        assert_eq!(buffer.data().len(), 12);
        assert!(buffer.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stamp_disk_core_and_edge() {
        let mut buffer = RasterBuffer::new(20, 20);
        buffer.stamp_disk(10.0, 10.0, 4.0, 1.0);

        // Pixel (9, 9) centre is ~0.7 from the disk centre: fully covered.
        assert!((buffer.get(9, 9) - 1.0).abs() < f32::EPSILON);
        // Far corner untouched.
        assert!(buffer.get(0, 0).abs() < f32::EPSILON);
        // Pixel (13, 9) centre is ~3.54 away: inside the 1px falloff band.
        let edge = buffer.get(13, 9);
        assert!(edge > 0.0 && edge < 1.0, "edge coverage {edge}");
    }

    #[test]
    fn test_stamp_saturates() {
        let mut buffer = RasterBuffer::new(10, 10);
        for _ in 0..5 {
            buffer.stamp_disk(5.0, 5.0, 3.0, 0.5);
        }
        assert!(buffer.data().iter().all(|&v| v <= 1.0));
        assert!((buffer.get(4, 4) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stamp_clips_at_border() {
        let mut buffer = RasterBuffer::new(8, 8);
        buffer.stamp_disk(-1.0, -1.0, 3.0, 1.0);
        buffer.stamp_disk(100.0, 100.0, 3.0, 1.0);
        assert!(buffer.get(0, 0) > 0.0);
    }

    #[test]
    fn test_draw_segment_covers_path() {
        let mut buffer = RasterBuffer::new(50, 10);
        buffer.draw_segment((5.0, 5.0), (45.0, 5.0), 2.0, 1.0, 1.0);
        for x in 5..45 {
            assert!(buffer.get(x, 4) > 0.5, "gap at x={x}");
        }
        assert!(buffer.get(48, 4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_length_segment_stamps_once() {
        let mut buffer = RasterBuffer::new(10, 10);
        buffer.draw_segment((5.0, 5.0), (5.0, 5.0), 2.0, 1.0, 1.0);
        assert!(buffer.get(4, 4) > 0.0);
    }

    #[test]
    fn test_downsample_uniform() {
        let mut buffer = RasterBuffer::new(20, 20);
        buffer.stamp_disk(10.0, 10.0, 100.0, 1.0);
        let small = buffer.downsample_bilinear(2, 2);
        assert_eq!(small.width(), 2);
        assert!(small.data().iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_downsample_preserves_position() {
        let mut buffer = RasterBuffer::new(100, 100);
        buffer.stamp_disk(15.0, 85.0, 6.0, 1.0);
        let small = buffer.downsample_bilinear(10, 10);
        assert!(small.get(1, 8) > 0.5);
        assert!(small.get(8, 1).abs() < f32::EPSILON);
    }
}
