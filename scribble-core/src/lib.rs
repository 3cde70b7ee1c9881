//! # Scribble Core
//!
//! Core logic for the written-calculation exercise: a child writes one digit
//! per result cell, and the recognized digit is verified column by column.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                scribble-core                │
//! ├─────────────────────────────────────────────┤
//! │  Stroke Capture  │  Problem Generator       │
//! │  - Touch events  │  - Rejection sampling    │
//! │  - Paths         │  - Carry / borrow rules  │
//! ├─────────────────────────────────────────────┤
//! │  Digit Grid      │  Recognition Policy      │
//! │  - Cells         │  - Point-count gate      │
//! │  - Focus         │  - Confidence gate       │
//! ├─────────────────────────────────────────────┤
//! │  Level Session: problem progression,        │
//! │  progress + messaging collaborators         │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calculation;
pub mod catalog;
pub mod error;
pub mod event;
pub mod grid;
pub mod level;
pub mod problem;
pub mod progress;
pub mod recognition;
pub mod stroke;

pub use calculation::{CalculationState, SubmitOutcome};
pub use catalog::{LevelCatalog, LevelIssue};
pub use error::{CoreError, CoreResult};
pub use event::{TouchEvent, TouchPhase, TouchPoint};
pub use grid::{build_cells, decimal_digits, CellId, CellStatus, DigitCell, RESULT_ROW};
pub use level::{GameSession, LevelEvent, LevelSession};
pub use problem::{
    borrow_chain_columns, borrow_columns, carry_columns, has_borrow, has_carry,
    CalculationProblem, GeneratorConfig, LevelConfig, Operation, ProblemGenerator,
};
pub use progress::{
    MessageTrigger, Messenger, NullMessenger, NullProgress, ProgressTracker, RecordingMessenger,
    RecordingProgress,
};
pub use recognition::{RecognitionDecision, RecognitionPolicy, RecognitionResult, DIGIT_CLASSES};
pub use stroke::{CanvasSize, Path, Point, StrokeRecorder, StrokeSet};

/// Scribble core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
