//! Terminal rendering of the calculation grid.

use std::fmt::Write;

use scribble_core::{CalculationState, CellStatus, RESULT_ROW};

/// Render the written calculation, columns right-aligned.
///
/// Result cells show the answered digit once correct, `?` for the focused
/// cell, `x` after a wrong answer and `_` otherwise.
#[must_use]
pub fn render_grid(state: &CalculationState) -> String {
    let width = state
        .cells()
        .iter()
        .map(|c| c.column() + 1)
        .max()
        .unwrap_or(1);
    let focused = state.current_cell_id();
    let symbol = state.problem().operation.symbol();

    let mut out = String::new();
    for row in 0..=RESULT_ROW {
        if row == RESULT_ROW {
            let _ = writeln!(out, "{}", "-".repeat(width * 2 + 2));
        }
        out.push(if row == 1 { symbol } else { ' ' });
        out.push(' ');
        for column in (0..width).rev() {
            let glyph = state
                .cells()
                .iter()
                .find(|c| c.row() == row && c.column() == column)
                .map_or(' ', |cell| {
                    if row != RESULT_ROW {
                        return cell.expected_value().map_or(' ', digit_char);
                    }
                    if Some(cell.id()) == focused && cell.status() != CellStatus::Correct {
                        return '?';
                    }
                    match cell.status() {
                        CellStatus::Correct => cell.user_value().map_or('_', digit_char),
                        CellStatus::Incorrect => 'x',
                        CellStatus::Unfilled | CellStatus::Fixed => '_',
                    }
                });
            out.push(' ');
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

fn digit_char(digit: u8) -> char {
    char::from(b'0' + digit)
}
