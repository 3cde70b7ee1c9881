//! Error types for calculation operations.

use thiserror::Error;

use crate::grid::CellId;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Level configuration is malformed (e.g. empty operand range).
    #[error("Invalid level configuration: {0}")]
    InvalidLevel(String),

    /// No operand pair satisfied the level constraints within the attempt cap.
    #[error("Level '{level}' is unsatisfiable: no operand pair found in {attempts} attempts")]
    UnsatisfiableLevel {
        /// Level identifier.
        level: String,
        /// Number of sampling attempts made.
        attempts: u32,
    },

    /// Cell not found in the current grid.
    #[error("Cell not found: {0}")]
    CellNotFound(CellId),

    /// Cell cannot take focus or input.
    #[error("Cell {0} is not editable")]
    CellNotEditable(CellId),

    /// Cell was already answered correctly.
    #[error("Cell {0} is already correct")]
    CellAlreadyCorrect(CellId),

    /// A submission arrived with no focused cell.
    #[error("No cell is focused")]
    NoFocusedCell,

    /// Submitted value is not a decimal digit.
    #[error("Invalid digit: {0}")]
    InvalidDigit(u8),

    /// The level has no more problems to play.
    #[error("Level already finished")]
    LevelFinished,

    /// A path was built without any points.
    #[error("Path must contain at least one point")]
    EmptyPath,

    /// Level not present in the catalogue.
    #[error("Level not found: {0}")]
    LevelNotFound(String),

    /// Content serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Content file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
