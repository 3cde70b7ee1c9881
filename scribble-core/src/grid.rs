//! Digit-cell grid for a written calculation.
//!
//! ```text
//!  column:   2   1   0
//!  row 0:        4   7      operand1
//!  row 1:  +     3   8      operand2
//!  row 2:        8   5      result (editable)
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::problem::CalculationProblem;

/// Row holding the result digits.
pub const RESULT_ROW: u8 = 2;

/// Unique identifier for a digit cell.
///
/// Ids are never reused across problems, so an id doubles as the identity
/// token for in-flight recognitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(Uuid);

impl CellId {
    /// Create a new unique cell ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a cell stands in the answer flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    /// Operand digit or blank position; never takes input.
    Fixed,
    /// Editable and not answered yet.
    Unfilled,
    /// Answered with the expected digit. Terminal.
    Correct,
    /// Answered with a wrong digit; may be retried.
    Incorrect,
}

/// One position of the calculation grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitCell {
    id: CellId,
    row: u8,
    column: usize,
    expected_value: Option<u8>,
    user_value: Option<u8>,
    is_editable: bool,
    is_correct: Option<bool>,
}

impl DigitCell {
    fn new(row: u8, column: usize, expected_value: Option<u8>) -> Self {
        Self {
            id: CellId::new(),
            row,
            column,
            expected_value,
            user_value: None,
            is_editable: row == RESULT_ROW && expected_value.is_some(),
            is_correct: None,
        }
    }

    /// Cell identifier.
    #[must_use]
    pub const fn id(&self) -> CellId {
        self.id
    }

    /// Grid row: 0 and 1 are operands, 2 is the result.
    #[must_use]
    pub const fn row(&self) -> u8 {
        self.row
    }

    /// Column, 0 being the units.
    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// Digit expected at this position, if the number reaches this column.
    #[must_use]
    pub const fn expected_value(&self) -> Option<u8> {
        self.expected_value
    }

    /// Digit last submitted by the user.
    #[must_use]
    pub const fn user_value(&self) -> Option<u8> {
        self.user_value
    }

    /// Whether the cell accepts input.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        self.is_editable
    }

    /// Outcome of the last submission, `None` before the first one.
    #[must_use]
    pub const fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    /// Current answer status.
    #[must_use]
    pub const fn status(&self) -> CellStatus {
        match (self.is_editable, self.is_correct) {
            (false, _) => CellStatus::Fixed,
            (true, None) => CellStatus::Unfilled,
            (true, Some(true)) => CellStatus::Correct,
            (true, Some(false)) => CellStatus::Incorrect,
        }
    }

    /// Record a submission and return whether it was correct.
    pub(crate) fn answer(&mut self, digit: u8) -> bool {
        let correct = self.expected_value == Some(digit);
        self.user_value = Some(digit);
        self.is_correct = Some(correct);
        correct
    }
}

/// Decimal digits of `n`, least significant first. `decimal_digits(0) == [0]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // n % 10 < 10
pub fn decimal_digits(mut n: u64) -> Vec<u8> {
    if n == 0 {
        return vec![0];
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push((n % 10) as u8);
        n /= 10;
    }
    digits
}

/// Build the grid of cells for `problem`, row by row, units column first.
#[must_use]
pub fn build_cells(problem: &CalculationProblem) -> Vec<DigitCell> {
    let rows = [
        decimal_digits(u64::from(problem.operand1)),
        decimal_digits(u64::from(problem.operand2)),
        decimal_digits(problem.result),
    ];
    let max_columns = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut cells = Vec::with_capacity(rows.len() * max_columns);
    for (row, digits) in (0_u8..).zip(rows.iter()) {
        for column in 0..max_columns {
            cells.push(DigitCell::new(row, column, digits.get(column).copied()));
        }
    }
    cells
}
