//! # Calculation State Machine
//!
//! Holds the active problem, its digit grid and the focused cell.
//!
//! Per editable cell:
//!
//! ```text
//! Unfilled ──submit──► Correct (terminal)
//!     ▲        │
//!     │        └─────► Incorrect ──next attempt──┐
//!     └──────────────────────────────────────────┘
//! ```
//!
//! Focus advances units → tens → hundreds after each correct digit. At most
//! one cell is focused, and it is always editable and not yet correct.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::grid::{build_cells, CellId, DigitCell};
use crate::problem::CalculationProblem;
use crate::recognition::RecognitionResult;
use crate::stroke::Path;

/// Outcome of a digit submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitOutcome {
    /// Correct digit; focus moved to `next`.
    Correct {
        /// The answered cell.
        cell: CellId,
        /// The newly focused cell.
        next: CellId,
    },
    /// Correct digit and every editable cell is now correct.
    ProblemComplete {
        /// The answered cell.
        cell: CellId,
    },
    /// Wrong digit; focus stays on `cell`.
    Incorrect {
        /// The answered cell.
        cell: CellId,
    },
}

impl SubmitOutcome {
    /// Whether the submitted digit was correct.
    #[must_use]
    pub const fn is_correct(&self) -> bool {
        !matches!(self, Self::Incorrect { .. })
    }
}

/// State of one problem being worked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationState {
    problem: CalculationProblem,
    cells: Vec<DigitCell>,
    current_cell_id: Option<CellId>,
    active_paths: Vec<Path>,
    last_recognition: Option<RecognitionResult>,
}

impl CalculationState {
    /// Build a fresh state for `problem`, focused on the units result cell.
    #[must_use]
    pub fn new(problem: CalculationProblem) -> Self {
        let cells = build_cells(&problem);
        let current_cell_id = cells
            .iter()
            .filter(|c| c.is_editable())
            .min_by_key(|c| c.column())
            .map(DigitCell::id);

        Self {
            problem,
            cells,
            current_cell_id,
            active_paths: Vec::new(),
            last_recognition: None,
        }
    }

    /// The problem being worked.
    #[must_use]
    pub const fn problem(&self) -> &CalculationProblem {
        &self.problem
    }

    /// All cells, row by row, units column first.
    #[must_use]
    pub fn cells(&self) -> &[DigitCell] {
        &self.cells
    }

    /// Look up a cell by id.
    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<&DigitCell> {
        self.cells.iter().find(|c| c.id() == id)
    }

    /// Id of the focused cell.
    #[must_use]
    pub const fn current_cell_id(&self) -> Option<CellId> {
        self.current_cell_id
    }

    /// The focused cell.
    #[must_use]
    pub fn current_cell(&self) -> Option<&DigitCell> {
        self.current_cell_id.and_then(|id| self.cell(id))
    }

    /// Paths drawn for the focused cell so far.
    #[must_use]
    pub fn active_paths(&self) -> &[Path] {
        &self.active_paths
    }

    /// Most recent recognition for the focused cell.
    #[must_use]
    pub const fn last_recognition(&self) -> Option<RecognitionResult> {
        self.last_recognition
    }

    /// Editable cells, units column first.
    pub fn editable_cells(&self) -> impl Iterator<Item = &DigitCell> {
        let mut editable: Vec<_> = self.cells.iter().filter(|c| c.is_editable()).collect();
        editable.sort_by_key(|c| c.column());
        editable.into_iter()
    }

    /// Add a finished path to the drawing for the focused cell.
    pub fn add_path(&mut self, path: Path) {
        self.active_paths.push(path);
    }

    /// Remember the latest recognition for the focused cell.
    pub fn record_recognition(&mut self, result: RecognitionResult) {
        self.last_recognition = Some(result);
    }

    /// Reset the drawing surface: paths and last recognition.
    pub fn clear_scratch(&mut self) {
        self.active_paths.clear();
        self.last_recognition = None;
    }

    /// Focus an editable, not-yet-correct cell.
    ///
    /// Any in-progress drawing for the previous cell is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist, is not editable, or is
    /// already correct.
    pub fn select_cell(&mut self, id: CellId) -> CoreResult<()> {
        let cell = self.cell(id).ok_or(CoreError::CellNotFound(id))?;
        if !cell.is_editable() {
            return Err(CoreError::CellNotEditable(id));
        }
        if cell.is_correct() == Some(true) {
            return Err(CoreError::CellAlreadyCorrect(id));
        }

        if self.current_cell_id != Some(id) {
            tracing::debug!("Focus moved to cell {id}");
            self.clear_scratch();
        }
        self.current_cell_id = Some(id);
        Ok(())
    }

    /// Submit `digit` for the focused cell.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDigit`] for values above 9 and
    /// [`CoreError::NoFocusedCell`] when nothing is focused (e.g. the
    /// problem is already complete).
    pub fn submit(&mut self, digit: u8) -> CoreResult<SubmitOutcome> {
        if digit > 9 {
            return Err(CoreError::InvalidDigit(digit));
        }
        let id = self.current_cell_id.ok_or(CoreError::NoFocusedCell)?;
        let cell = self
            .cells
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(CoreError::CellNotFound(id))?;
        let column = cell.column();

        if !cell.answer(digit) {
            tracing::debug!("Cell {id} (column {column}): {digit} is incorrect");
            self.clear_scratch();
            return Ok(SubmitOutcome::Incorrect { cell: id });
        }

        self.clear_scratch();
        if self.is_problem_complete() {
            tracing::debug!("Problem {} complete", self.problem);
            self.current_cell_id = None;
            return Ok(SubmitOutcome::ProblemComplete { cell: id });
        }

        let next = self.next_unsolved_after(column);
        self.current_cell_id = next;
        match next {
            Some(next) => Ok(SubmitOutcome::Correct { cell: id, next }),
            None => Ok(SubmitOutcome::ProblemComplete { cell: id }),
        }
    }

    /// Whether every editable cell holds the correct digit.
    #[must_use]
    pub fn is_problem_complete(&self) -> bool {
        self.cells
            .iter()
            .filter(|c| c.is_editable())
            .all(|c| c.is_correct() == Some(true))
    }

    /// Next unsolved editable cell to the left of `column`, wrapping back to
    /// the lowest unsolved column when focus was moved out of order.
    fn next_unsolved_after(&self, column: usize) -> Option<CellId> {
        let unsolved = || {
            self.cells
                .iter()
                .filter(|c| c.is_editable() && c.is_correct() != Some(true))
        };
        unsolved()
            .filter(|c| c.column() > column)
            .min_by_key(|c| c.column())
            .or_else(|| unsolved().min_by_key(|c| c.column()))
            .map(DigitCell::id)
    }
}
