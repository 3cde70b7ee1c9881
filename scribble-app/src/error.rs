//! Exercise error types.

use scribble_core::CoreError;
use thiserror::Error;

use crate::exercise::SurfacePhase;

/// Result type for exercise operations.
pub type ExerciseResult<T> = Result<T, ExerciseError>;

/// Errors surfaced by the exercise flow.
///
/// These are programming or timing errors of the host; the child only ever
/// sees ordinary feedback.
#[derive(Debug, Error)]
pub enum ExerciseError {
    /// The drawing surface does not accept this action right now.
    #[error("Action not allowed while {0:?}")]
    SurfaceBusy(SurfacePhase),

    /// A recognition or confirmation arrived for a superseded request.
    #[error("Recognition ticket is stale")]
    StaleTicket,

    /// Nothing has been drawn for the focused cell.
    #[error("Nothing to recognize")]
    NothingDrawn,

    /// Core state-machine error.
    #[error(transparent)]
    Core(#[from] CoreError),
}
