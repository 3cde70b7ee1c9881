//! # Level Progression
//!
//! A level is a batch of problems sharing one [`LevelConfig`]. Each solved
//! problem is replaced wholesale by a freshly generated one until
//! `problem_count` problems are solved and the level is won.
//!
//! ```text
//! Playing ──solve──► AwaitingNext ──next_problem──► Playing
//!    │
//!    └──solve last──► Won
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::calculation::{CalculationState, SubmitOutcome};
use crate::error::{CoreError, CoreResult};
use crate::grid::CellId;
use crate::problem::{LevelConfig, ProblemGenerator};

/// Record of a won level, handed to the progress collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    /// Level identifier.
    pub level_id: String,
    /// Digits submitted, right or wrong.
    pub moves: u32,
    /// Wrong digits submitted.
    pub invalid_moves: u32,
    /// Hints revealed.
    pub hints_used: u32,
    /// Problems solved.
    pub problems_solved: u32,
    /// Completion time (ms since epoch).
    pub completed_at_ms: u64,
}

/// What a submission did to the level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelEvent {
    /// Correct digit; focus moved to the next cell.
    Advanced {
        /// The answered cell.
        cell: CellId,
        /// The newly focused cell.
        next: CellId,
    },
    /// Wrong digit; the cell can be retried.
    WrongDigit {
        /// The answered cell.
        cell: CellId,
    },
    /// A problem was solved and more remain.
    ProblemSolved {
        /// Problems solved so far.
        solved: u32,
        /// Problems still to solve.
        remaining: u32,
    },
    /// The last problem was solved.
    LevelWon(GameSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Playing,
    AwaitingNext,
    Won,
}

/// Problems, counters and the active calculation of one level.
pub struct LevelSession {
    level: LevelConfig,
    generator: ProblemGenerator,
    rng: Box<dyn RngCore + Send>,
    state: CalculationState,
    phase: Phase,
    problem_index: u32,
    solved: u32,
    moves: u32,
    invalid_moves: u32,
    hints_used: u32,
}

impl fmt::Debug for LevelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelSession")
            .field("level", &self.level.id)
            .field("phase", &self.phase)
            .field("problem_index", &self.problem_index)
            .field("solved", &self.solved)
            .field("moves", &self.moves)
            .finish_non_exhaustive()
    }
}

impl LevelSession {
    /// Start `level` with its first problem.
    ///
    /// # Errors
    ///
    /// Returns an error if the level is malformed or unsatisfiable.
    pub fn new(
        level: LevelConfig,
        generator: ProblemGenerator,
        mut rng: Box<dyn RngCore + Send>,
    ) -> CoreResult<Self> {
        let problem = generator.generate(&level, rng.as_mut())?;
        tracing::info!("Level {} started with {problem}", level.id);

        Ok(Self {
            level,
            generator,
            rng,
            state: CalculationState::new(problem),
            phase: Phase::Playing,
            problem_index: 0,
            solved: 0,
            moves: 0,
            invalid_moves: 0,
            hints_used: 0,
        })
    }

    /// The level being played.
    #[must_use]
    pub const fn level(&self) -> &LevelConfig {
        &self.level
    }

    /// The active calculation.
    #[must_use]
    pub const fn state(&self) -> &CalculationState {
        &self.state
    }

    /// Mutable access to the active calculation (focus, drawing scratch).
    pub fn state_mut(&mut self) -> &mut CalculationState {
        &mut self.state
    }

    /// Zero-based index of the active problem.
    #[must_use]
    pub const fn problem_index(&self) -> u32 {
        self.problem_index
    }

    /// Problems solved so far.
    #[must_use]
    pub const fn problems_solved(&self) -> u32 {
        self.solved
    }

    /// Whether a solved problem is waiting to be replaced.
    #[must_use]
    pub fn is_awaiting_next_problem(&self) -> bool {
        self.phase == Phase::AwaitingNext
    }

    /// Whether the level has been won.
    #[must_use]
    pub fn is_won(&self) -> bool {
        self.phase == Phase::Won
    }

    /// Submit `digit` for the focused cell of the active problem.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LevelFinished`] after the level is won, and
    /// propagates state-machine errors (no focus, invalid digit).
    pub fn submit(&mut self, digit: u8) -> CoreResult<LevelEvent> {
        if self.phase == Phase::Won {
            return Err(CoreError::LevelFinished);
        }

        let outcome = self.state.submit(digit)?;
        self.moves += 1;

        let event = match outcome {
            SubmitOutcome::Correct { cell, next } => LevelEvent::Advanced { cell, next },
            SubmitOutcome::Incorrect { cell } => {
                self.invalid_moves += 1;
                LevelEvent::WrongDigit { cell }
            }
            SubmitOutcome::ProblemComplete { .. } => {
                self.solved += 1;
                if self.solved >= self.level.problem_count {
                    self.phase = Phase::Won;
                    let session = self.game_session();
                    tracing::info!(
                        "Level {} won: {} moves, {} invalid, {} hints",
                        session.level_id,
                        session.moves,
                        session.invalid_moves,
                        session.hints_used
                    );
                    LevelEvent::LevelWon(session)
                } else {
                    self.phase = Phase::AwaitingNext;
                    LevelEvent::ProblemSolved {
                        solved: self.solved,
                        remaining: self.level.problem_count - self.solved,
                    }
                }
            }
        };
        Ok(event)
    }

    /// Replace the solved problem with a freshly generated one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LevelFinished`] if the level is won or the
    /// current problem is not solved yet, and generation errors otherwise.
    pub fn next_problem(&mut self) -> CoreResult<()> {
        if self.phase != Phase::AwaitingNext {
            return Err(CoreError::LevelFinished);
        }
        let problem = self.generator.generate(&self.level, self.rng.as_mut())?;
        tracing::debug!("Level {} problem {}: {problem}", self.level.id, self.problem_index + 1);

        self.state = CalculationState::new(problem);
        self.problem_index += 1;
        self.phase = Phase::Playing;
        Ok(())
    }

    /// Reveal the expected digit of the focused cell, counting it as a hint.
    pub fn reveal_hint(&mut self) -> Option<u8> {
        let digit = self.state.current_cell()?.expected_value()?;
        self.hints_used += 1;
        Some(digit)
    }

    /// Snapshot of the counters as a session record.
    #[must_use]
    pub fn game_session(&self) -> GameSession {
        GameSession {
            level_id: self.level.id.clone(),
            moves: self.moves,
            invalid_moves: self.invalid_moves,
            hints_used: self.hints_used,
            problems_solved: self.solved,
            completed_at_ms: now_ms(),
        }
    }
}

/// Current time in milliseconds since epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Timestamps won't exceed u64 for billions of years
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Operation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(count: u32) -> LevelSession {
        let level = LevelConfig {
            id: "add-small".to_string(),
            operation: Operation::Addition,
            min_operand: 1,
            max_operand: 4,
            requires_carry_or_borrow: false,
            problem_count: count,
        };
        LevelSession::new(
            level,
            ProblemGenerator::new(),
            Box::new(StdRng::seed_from_u64(42)),
        )
        .unwrap()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn answer(session: &LevelSession) -> u8 {
        session.state().problem().result as u8
    }

    #[test]
    fn test_single_problem_level_won() {
        let mut session = session(1);
        let digit = answer(&session);
        match session.submit(digit).unwrap() {
            LevelEvent::LevelWon(record) => {
                assert_eq!(record.level_id, "add-small");
                assert_eq!(record.moves, 1);
                assert_eq!(record.problems_solved, 1);
            }
            other => panic!("Expected LevelWon, got {other:?}"),
        }
        assert!(session.is_won());
        assert!(matches!(session.submit(digit), Err(CoreError::LevelFinished)));
    }

    #[test]
    fn test_multi_problem_progression() {
        let mut session = session(2);
        let digit = answer(&session);
        assert_eq!(
            session.submit(digit).unwrap(),
            LevelEvent::ProblemSolved { solved: 1, remaining: 1 }
        );
        assert!(session.is_awaiting_next_problem());
        assert!(matches!(session.submit(digit), Err(CoreError::NoFocusedCell)));

        session.next_problem().unwrap();
        assert_eq!(session.problem_index(), 1);
        assert!(session.state().current_cell_id().is_some());

        let digit = answer(&session);
        assert!(matches!(session.submit(digit).unwrap(), LevelEvent::LevelWon(_)));
    }

    #[test]
    fn test_wrong_digit_counted() {
        let mut session = session(1);
        let wrong = (answer(&session) + 1) % 10;
        assert!(matches!(
            session.submit(wrong).unwrap(),
            LevelEvent::WrongDigit { .. }
        ));
        let record = session.game_session();
        assert_eq!(record.moves, 1);
        assert_eq!(record.invalid_moves, 1);
    }

    #[test]
    fn test_next_problem_requires_solved() {
        let mut session = session(2);
        assert!(session.next_problem().is_err());
    }

    #[test]
    fn test_hint_counts() {
        let mut session = session(1);
        let expected = answer(&session);
        assert_eq!(session.reveal_hint(), Some(expected));
        assert_eq!(session.game_session().hints_used, 1);
    }
}
