//! # Stroke Capture
//!
//! Turns pointer/touch movement into finished [`Path`]s.
//!
//! ```text
//! Start ──► Move* ──► End     → Path (≥ 2 points)
//!   │                  ▲
//!   └──── (no move) ───┘      → tap: two near-identical points
//! Cancel                      → in-progress path discarded
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::event::{TouchEvent, TouchPhase};

/// Offset applied to the synthetic second point of a tap.
const TAP_OFFSET: f32 = 0.5;

/// A point in source-canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size of the drawing canvas the points were captured on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in canvas units.
    pub width: f32,
    /// Height in canvas units.
    pub height: f32,
}

impl CanvasSize {
    /// Create a new canvas size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are finite and positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(300.0, 300.0)
    }
}

/// One continuous contact gesture. Never empty, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PathRecord", into = "PathRecord")]
pub struct Path {
    points: Vec<Point>,
    created_at_ms: u64,
}

#[derive(Serialize, Deserialize)]
struct PathRecord {
    points: Vec<Point>,
    #[serde(default)]
    created_at_ms: u64,
}

impl TryFrom<PathRecord> for Path {
    type Error = CoreError;

    fn try_from(record: PathRecord) -> CoreResult<Self> {
        Self::new(record.points, record.created_at_ms)
    }
}

impl From<Path> for PathRecord {
    fn from(path: Path) -> Self {
        Self {
            points: path.points,
            created_at_ms: path.created_at_ms,
        }
    }
}

impl Path {
    /// Create a path from captured points.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyPath`] if `points` is empty.
    pub fn new(points: Vec<Point>, created_at_ms: u64) -> CoreResult<Self> {
        if points.is_empty() {
            return Err(CoreError::EmptyPath);
        }
        Ok(Self {
            points,
            created_at_ms,
        })
    }

    /// Create the mark left by a tap: two near-identical points so the
    /// rasterizer always has a segment to draw.
    #[must_use]
    pub fn tap(at: Point, created_at_ms: u64) -> Self {
        Self {
            points: vec![at, Point::new(at.x + TAP_OFFSET, at.y + TAP_OFFSET)],
            created_at_ms,
        }
    }

    /// The ordered points of this path.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points in this path.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// When the gesture started (ms since surface creation).
    #[must_use]
    pub const fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    /// Total number of points across a set of paths.
    #[must_use]
    pub fn total_points(paths: &[Path]) -> usize {
        paths.iter().map(Path::point_count).sum()
    }
}

/// Serialized drawing: the paths of one cell plus the canvas they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeSet {
    /// Canvas dimensions at capture time.
    pub canvas: CanvasSize,
    /// Finished paths.
    pub paths: Vec<Path>,
}

impl StrokeSet {
    /// Parse a stroke set from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or contains an empty path.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this stroke set to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
struct PendingPath {
    touch_id: u32,
    points: Vec<Point>,
    started_at_ms: u64,
}

/// Records touch events into finished paths.
#[derive(Debug, Default)]
pub struct StrokeRecorder {
    pending: Option<PendingPath>,
}

impl StrokeRecorder {
    /// Create an idle recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a touch event.
    ///
    /// Returns the finished path when a gesture ends. Extra contacts never
    /// draw, so a resting palm does not produce ink, but the contact being
    /// tracked still finishes its path when it lifts.
    pub fn process(&mut self, event: &TouchEvent) -> Option<Path> {
        let touch = if event.is_multi_touch() {
            let tracked = self.pending.as_ref().map(|p| p.touch_id);
            match (event.phase, tracked) {
                (TouchPhase::End, Some(id)) => event.contacts.iter().find(|c| c.id == id)?,
                _ => return None,
            }
        } else {
            event.primary()?
        };
        let point = touch.position;

        match event.phase {
            TouchPhase::Start => {
                let finished = self.pending.take().and_then(Self::finish);
                self.pending = Some(PendingPath {
                    touch_id: touch.id,
                    points: vec![point],
                    started_at_ms: event.timestamp_ms,
                });
                finished
            }
            TouchPhase::Move => {
                if let Some(pending) = self.pending.as_mut() {
                    if pending.touch_id == touch.id && pending.points.last() != Some(&point) {
                        pending.points.push(point);
                    }
                }
                None
            }
            TouchPhase::End => {
                let mut pending = self.pending.take()?;
                if pending.touch_id != touch.id {
                    self.pending = Some(pending);
                    return None;
                }
                if pending.points.last() != Some(&point) {
                    pending.points.push(point);
                }
                Self::finish(pending)
            }
            TouchPhase::Cancel => {
                if self.pending.take().is_some() {
                    tracing::debug!("Touch cancelled, discarding in-progress path");
                }
                None
            }
        }
    }

    /// Points of the gesture currently being drawn.
    #[must_use]
    pub fn in_progress(&self) -> Option<&[Point]> {
        self.pending.as_ref().map(|p| p.points.as_slice())
    }

    /// Drop any in-progress gesture.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    fn finish(pending: PendingPath) -> Option<Path> {
        match pending.points.as_slice() {
            [] => None,
            [only] => Some(Path::tap(*only, pending.started_at_ms)),
            _ => Path::new(pending.points, pending.started_at_ms).ok(),
        }
    }
}
