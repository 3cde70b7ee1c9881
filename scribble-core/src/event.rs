//! Contact events from the drawing surface, in canvas coordinates.

use serde::{Deserialize, Serialize};

use crate::stroke::Point;

/// Where a contact is in its gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Pen or finger put down.
    Start,
    /// Contact moved while down.
    Move,
    /// Contact lifted; the gesture is complete.
    End,
    /// The platform withdrew the gesture. Nothing it drew is kept.
    Cancel,
}

/// One contact on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Contact identifier, stable for the length of a gesture.
    pub id: u32,
    /// Canvas position.
    pub position: Point,
}

impl TouchPoint {
    /// Contact `id` at `(x, y)`.
    #[must_use]
    pub const fn new(id: u32, x: f32, y: f32) -> Self {
        Self {
            id,
            position: Point::new(x, y),
        }
    }
}

/// Every contact reported in one surface callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Gesture phase.
    pub phase: TouchPhase,
    /// Contacts down at the time of the event, primary first.
    pub contacts: Vec<TouchPoint>,
    /// Milliseconds since the surface was created.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Event carrying `contacts`.
    #[must_use]
    pub fn new(phase: TouchPhase, contacts: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            contacts,
            timestamp_ms,
        }
    }

    /// Event with a single contact, id 0.
    #[must_use]
    pub fn single(phase: TouchPhase, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(phase, vec![TouchPoint::new(0, x, y)], timestamp_ms)
    }

    /// The contact that draws.
    #[must_use]
    pub fn primary(&self) -> Option<&TouchPoint> {
        self.contacts.first()
    }

    /// More than one contact is down, e.g. a resting palm.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.contacts.len() > 1
    }
}
