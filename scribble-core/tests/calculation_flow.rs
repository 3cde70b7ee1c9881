//! Calculation Flow Integration Tests
//!
//! Tests the problem → grid → submission flow end to end:
//! - Generated problems are exact and honour carry/borrow requirements
//! - Grid cardinality and completion
//! - Correct, incorrect and multi-cell submission scenarios

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scribble_core::{
    decimal_digits, has_borrow, has_carry, CalculationProblem, CalculationState, CellStatus,
    LevelConfig, LevelEvent, LevelSession, Operation, Path, Point, ProblemGenerator,
    RecognitionResult, SubmitOutcome, RESULT_ROW,
};

fn level(operation: Operation, min: u32, max: u32, carry: bool, count: u32) -> LevelConfig {
    LevelConfig {
        id: format!("{operation:?}-{min}-{max}-{carry}"),
        operation,
        min_operand: min,
        max_operand: max,
        requires_carry_or_borrow: carry,
        problem_count: count,
    }
}

/// Expected result digit for `column`.
fn expected(state: &CalculationState, column: usize) -> u8 {
    decimal_digits(state.problem().result)[column]
}

// ============================================================================
// Generator Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_generated_problems_are_exact(
        seed in any::<u64>(),
        subtract in any::<bool>(),
        carry in any::<bool>(),
    ) {
        let operation = if subtract { Operation::Subtraction } else { Operation::Addition };
        let config = level(operation, 10, 999, carry, 1);
        let mut rng = StdRng::seed_from_u64(seed);
        let problem = ProblemGenerator::new().generate(&config, &mut rng).unwrap();

        let (a, b) = (u64::from(problem.operand1), u64::from(problem.operand2));
        match operation {
            Operation::Addition => prop_assert_eq!(a + b, problem.result),
            Operation::Subtraction => {
                prop_assert!(a >= b);
                prop_assert_eq!(a - b, problem.result);
            }
        }
    }

    #[test]
    fn prop_carry_borrow_conformance(
        seed in any::<u64>(),
        subtract in any::<bool>(),
        carry in any::<bool>(),
    ) {
        let operation = if subtract { Operation::Subtraction } else { Operation::Addition };
        let config = level(operation, 1, 99, carry, 1);
        let mut rng = StdRng::seed_from_u64(seed);
        let problem = ProblemGenerator::new().generate(&config, &mut rng).unwrap();

        let (a, b) = (u64::from(problem.operand1), u64::from(problem.operand2));
        let predicate = match operation {
            Operation::Addition => has_carry(a, b),
            Operation::Subtraction => has_borrow(a, b),
        };
        prop_assert_eq!(predicate, carry);
    }

    #[test]
    fn prop_grid_cardinality(a in 0_u32..100_000, b in 0_u32..100_000, subtract in any::<bool>()) {
        let operation = if subtract { Operation::Subtraction } else { Operation::Addition };
        let state = CalculationState::new(CalculationProblem::new(operation, a, b));
        let editable = state.cells().iter().filter(|c| c.is_editable()).count();
        prop_assert_eq!(editable, decimal_digits(state.problem().result).len());
        prop_assert!(!state.is_problem_complete());
    }

    #[test]
    fn prop_answering_every_cell_completes(a in 0_u32..10_000, b in 0_u32..10_000) {
        let mut state = CalculationState::new(CalculationProblem::new(Operation::Addition, a, b));
        let digits = decimal_digits(state.problem().result);
        for (column, digit) in digits.iter().enumerate() {
            prop_assert!(!state.is_problem_complete());
            let focused = state.current_cell().map(|c| c.column());
            prop_assert_eq!(focused, Some(column));
            state.submit(*digit).unwrap();
        }
        prop_assert!(state.is_problem_complete());
    }
}

// ============================================================================
// Submission Scenarios
// ============================================================================

#[test]
fn test_correct_submission_wins_single_problem_level() {
    let config = level(Operation::Addition, 1, 9, false, 1);
    let mut session = LevelSession::new(
        config,
        ProblemGenerator::new(),
        Box::new(StdRng::seed_from_u64(3)),
    )
    .unwrap();

    let problem = *session.state().problem();
    assert!(problem.result < 10, "non-carry single-digit sum expected");
    assert_eq!(session.state().editable_cells().count(), 1);

    let digit = expected(session.state(), 0);
    let event = session.submit(digit).unwrap();

    assert!(session.state().is_problem_complete());
    match event {
        LevelEvent::LevelWon(record) => assert_eq!(record.problems_solved, 1),
        other => panic!("Expected LevelWon, got {other:?}"),
    }
    assert!(session.is_won());
}

#[test]
fn test_incorrect_submission_scenario() {
    let mut state = CalculationState::new(CalculationProblem::new(Operation::Addition, 34, 21));
    let units = state.current_cell_id().unwrap();
    state.add_path(Path::new(vec![Point::new(1.0, 1.0), Point::new(9.0, 9.0)], 0).unwrap());
    state.record_recognition(RecognitionResult::new(4, 0.7));

    let wrong = (expected(&state, 0) + 1) % 10;
    let outcome = state.submit(wrong).unwrap();

    assert_eq!(outcome, SubmitOutcome::Incorrect { cell: units });
    let cell = state.cell(units).unwrap();
    assert_eq!(cell.user_value(), Some(wrong));
    assert_eq!(cell.is_correct(), Some(false));
    assert_eq!(cell.status(), CellStatus::Incorrect);
    assert!(state.active_paths().is_empty());
    assert!(state.last_recognition().is_none());
    assert_eq!(state.current_cell_id(), Some(units));
}

#[test]
fn test_multi_cell_progression_scenario() {
    // 34 + 21 = 55
    let mut state = CalculationState::new(CalculationProblem::new(Operation::Addition, 34, 21));
    let result_cells: Vec<_> = {
        let mut cells: Vec<_> = state
            .cells()
            .iter()
            .filter(|c| c.row() == RESULT_ROW)
            .collect();
        cells.sort_by_key(|c| c.column());
        cells.iter().map(|c| c.id()).collect()
    };
    assert_eq!(state.current_cell_id(), Some(result_cells[0]));

    let outcome = state.submit(5).unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Correct {
            cell: result_cells[0],
            next: result_cells[1]
        }
    );
    assert!(!state.is_problem_complete());

    let outcome = state.submit(5).unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::ProblemComplete {
            cell: result_cells[1]
        }
    );
    assert!(state.is_problem_complete());
}

#[test]
fn test_level_replaces_state_wholesale() {
    let config = level(Operation::Subtraction, 10, 99, true, 2);
    let mut session = LevelSession::new(
        config,
        ProblemGenerator::new(),
        Box::new(StdRng::seed_from_u64(11)),
    )
    .unwrap();

    let first_ids: Vec<_> = session.state().cells().iter().map(|c| c.id()).collect();
    let digits = decimal_digits(session.state().problem().result);
    for digit in &digits {
        session.submit(*digit).unwrap();
    }
    assert!(session.is_awaiting_next_problem());

    session.next_problem().unwrap();
    let state = session.state();
    assert!(state
        .cells()
        .iter()
        .all(|c| !first_ids.contains(&c.id())));
    assert!(state.active_paths().is_empty());
    assert!(state.current_cell_id().is_some());
}
