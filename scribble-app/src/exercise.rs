//! # Exercise Flow
//!
//! One level of the written-calculation exercise as seen by the drawing
//! surface: strokes in, recognitions round-tripped through the classifier,
//! progress and messaging cues out.
//!
//! ```text
//!            begin_recognition            complete (auto-submit)
//! Drawing ─────────────────────► Recognizing ─────────────────────► Confirming
//!    ▲                                │ rejected / low confidence       │ confirm
//!    └────────────────────────────────┴─────────────────────────────────┤
//!    ▲                                                                  ▼
//!    └──────── advance_problem ──────── Transition ◄── problem solved ──┤
//!                                                                       ▼
//!                                                   Finished ◄── level won
//! ```
//!
//! Every recognition carries a [`RecognitionTicket`]. Focus changes, new
//! problems and cleared drawings invalidate outstanding tickets, so a late
//! classifier result or timer can never land on the wrong cell.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use scribble_core::{
    CalculationState, CanvasSize, CellId, GameSession, LevelEvent, LevelSession, MessageTrigger,
    Messenger, Path, ProgressTracker, RecognitionDecision, RecognitionPolicy, RecognitionResult,
    StrokeRecorder, TouchEvent, DIGIT_CLASSES,
};
use scribble_raster::{RasterConfig, RasterImage, Rasterizer};
use serde::{Deserialize, Serialize};

use crate::error::{ExerciseError, ExerciseResult};

/// What the drawing surface is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfacePhase {
    /// Accepting strokes for the focused cell.
    Drawing,
    /// Waiting for the classifier.
    Recognizing,
    /// Showing an accepted digit before it is submitted.
    Confirming,
    /// A problem was solved; the next one follows shortly.
    Transition,
    /// The level is won.
    Finished,
}

impl SurfacePhase {
    /// Whether strokes are accepted.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Drawing)
    }
}

/// Identity of one recognition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecognitionTicket {
    cell: CellId,
    problem_index: u32,
    sequence: u64,
}

impl RecognitionTicket {
    /// The cell the recognition is for.
    #[must_use]
    pub const fn cell(&self) -> CellId {
        self.cell
    }

    /// The problem the recognition is for.
    #[must_use]
    pub const fn problem_index(&self) -> u32 {
        self.problem_index
    }
}

/// A classifier job handed out by [`Exercise::begin_recognition`].
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Must accompany the classifier result.
    pub ticket: RecognitionTicket,
    /// The rasterized drawing.
    pub image: RasterImage,
}

/// Result of feeding classifier output back into the exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecognitionOutcome {
    /// Too little ink or an unusable distribution; keep drawing.
    Rejected,
    /// A digit was recognized but not confidently; keep drawing or use the pad.
    LowConfidence(RecognitionResult),
    /// Accepted; call [`Exercise::confirm`] with `ticket` after `delay`.
    Pending {
        /// Ticket to confirm.
        ticket: RecognitionTicket,
        /// The accepted recognition.
        result: RecognitionResult,
        /// Confirmation window.
        delay: Duration,
    },
    /// The request was superseded and its result discarded.
    Stale,
}

/// Tunables for the exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseConfig {
    /// Recognition thresholds.
    pub policy: RecognitionPolicy,
    /// Rasterizer tuning.
    pub raster: RasterConfig,
    /// Size of the drawing surface.
    pub canvas: CanvasSize,
    /// Pause between a solved problem and the next one.
    pub next_problem_delay: Duration,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            policy: RecognitionPolicy::default(),
            raster: RasterConfig::default(),
            canvas: CanvasSize::default(),
            next_problem_delay: Duration::from_millis(1500),
        }
    }
}

/// A level in play, with its drawing surface and collaborators.
pub struct Exercise {
    session: LevelSession,
    config: ExerciseConfig,
    rasterizer: Rasterizer,
    recorder: StrokeRecorder,
    phase: SurfacePhase,
    sequence: u64,
    outstanding: Option<RecognitionTicket>,
    pending_digit: Option<u8>,
    progress: Arc<dyn ProgressTracker>,
    messenger: Arc<dyn Messenger>,
}

impl fmt::Debug for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exercise")
            .field("session", &self.session)
            .field("phase", &self.phase)
            .field("outstanding", &self.outstanding)
            .finish_non_exhaustive()
    }
}

impl Exercise {
    /// Start playing `session`.
    #[must_use]
    pub fn new(
        session: LevelSession,
        config: ExerciseConfig,
        progress: Arc<dyn ProgressTracker>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        tracing::info!("Exercise started on level {}", session.level().id);
        messenger.cue(MessageTrigger::GameStart);
        Self {
            rasterizer: Rasterizer::with_config(config.raster.clone()),
            session,
            config,
            recorder: StrokeRecorder::new(),
            phase: SurfacePhase::Drawing,
            sequence: 0,
            outstanding: None,
            pending_digit: None,
            progress,
            messenger,
        }
    }

    /// Current surface phase.
    #[must_use]
    pub const fn phase(&self) -> SurfacePhase {
        self.phase
    }

    /// The level being played.
    #[must_use]
    pub const fn session(&self) -> &LevelSession {
        &self.session
    }

    /// The active calculation.
    #[must_use]
    pub const fn state(&self) -> &CalculationState {
        self.session.state()
    }

    /// Active tunables.
    #[must_use]
    pub const fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    /// Snapshot of the level counters.
    #[must_use]
    pub fn game_session(&self) -> GameSession {
        self.session.game_session()
    }

    /// Feed a touch event to the stroke recorder.
    ///
    /// Ignored unless the surface is drawing for a focused cell. Returns the
    /// finished path, which is also added to the cell's drawing.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> Option<Path> {
        if !self.phase.accepts_input() || self.state().current_cell_id().is_none() {
            tracing::debug!("Ignoring touch while {:?}", self.phase);
            return None;
        }
        let path = self.recorder.process(event)?;
        self.session.state_mut().add_path(path.clone());
        Some(path)
    }

    /// Add a finished path to the focused cell's drawing.
    ///
    /// # Errors
    ///
    /// Returns [`ExerciseError::SurfaceBusy`] outside the drawing phase and
    /// a core error when no cell is focused.
    pub fn add_path(&mut self, path: Path) -> ExerciseResult<()> {
        self.ensure_drawing()?;
        if self.state().current_cell_id().is_none() {
            return Err(scribble_core::CoreError::NoFocusedCell.into());
        }
        self.session.state_mut().add_path(path);
        Ok(())
    }

    /// Discard the focused cell's drawing and any outstanding recognition.
    pub fn clear_drawing(&mut self) {
        self.invalidate();
        self.recorder.clear();
        self.session.state_mut().clear_scratch();
        if matches!(self.phase, SurfacePhase::Recognizing | SurfacePhase::Confirming) {
            self.phase = SurfacePhase::Drawing;
        }
    }

    /// Rasterize the current drawing and hand out a classifier job.
    ///
    /// The surface stops accepting input until the result comes back.
    ///
    /// # Errors
    ///
    /// Returns an error outside the drawing phase, without focus, or when
    /// nothing has been drawn.
    pub fn begin_recognition(&mut self) -> ExerciseResult<RecognitionRequest> {
        self.ensure_drawing()?;
        let cell = self
            .state()
            .current_cell_id()
            .ok_or(scribble_core::CoreError::NoFocusedCell)?;
        if self.state().active_paths().is_empty() {
            return Err(ExerciseError::NothingDrawn);
        }

        self.sequence += 1;
        let ticket = RecognitionTicket {
            cell,
            problem_index: self.session.problem_index(),
            sequence: self.sequence,
        };
        let image = self
            .rasterizer
            .rasterize(self.state().active_paths(), self.config.canvas);

        self.outstanding = Some(ticket);
        self.phase = SurfacePhase::Recognizing;
        tracing::debug!("Recognition #{} started for cell {cell}", ticket.sequence);
        Ok(RecognitionRequest { ticket, image })
    }

    /// Apply classifier output for `ticket`.
    pub fn complete_recognition(
        &mut self,
        ticket: RecognitionTicket,
        probabilities: &[f32; DIGIT_CLASSES],
    ) -> RecognitionOutcome {
        if self.phase != SurfacePhase::Recognizing || self.outstanding != Some(ticket) {
            tracing::debug!("Discarding stale recognition #{}", ticket.sequence);
            return RecognitionOutcome::Stale;
        }

        let decision = self
            .config
            .policy
            .decide(self.state().active_paths(), probabilities);
        self.session.state_mut().record_recognition(decision.result());

        match decision {
            RecognitionDecision::Rejected => {
                self.outstanding = None;
                self.phase = SurfacePhase::Drawing;
                RecognitionOutcome::Rejected
            }
            RecognitionDecision::LowConfidence(result) => {
                self.outstanding = None;
                self.phase = SurfacePhase::Drawing;
                RecognitionOutcome::LowConfidence(result)
            }
            RecognitionDecision::AutoSubmit { result, delay } => {
                self.pending_digit = result.digit();
                self.phase = SurfacePhase::Confirming;
                tracing::debug!(
                    "Recognized {:?} ({:.2}); submitting in {delay:?}",
                    result.digit(),
                    result.confidence
                );
                RecognitionOutcome::Pending {
                    ticket,
                    result,
                    delay,
                }
            }
        }
    }

    /// Submit the digit accepted for `ticket` once its window elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`ExerciseError::StaleTicket`] if `ticket` is not the one
    /// awaiting confirmation.
    pub fn confirm(&mut self, ticket: RecognitionTicket) -> ExerciseResult<LevelEvent> {
        if self.phase != SurfacePhase::Confirming || self.outstanding != Some(ticket) {
            return Err(ExerciseError::StaleTicket);
        }
        let digit = self.pending_digit.take().ok_or(ExerciseError::StaleTicket)?;
        self.outstanding = None;
        self.submit_digit(digit)
    }

    /// Submit a digit from the on-screen pad, bypassing recognition.
    ///
    /// # Errors
    ///
    /// Returns an error outside the drawing phase and propagates
    /// state-machine errors (no focus, invalid digit).
    pub fn submit_manual(&mut self, digit: u8) -> ExerciseResult<LevelEvent> {
        self.ensure_drawing()?;
        self.invalidate();
        self.submit_digit(digit)
    }

    /// Move focus to another cell, discarding drawing and recognition.
    ///
    /// # Errors
    ///
    /// Returns an error between problems, after the level, or if the cell
    /// cannot take focus.
    pub fn select_cell(&mut self, id: CellId) -> ExerciseResult<()> {
        if matches!(self.phase, SurfacePhase::Transition | SurfacePhase::Finished) {
            return Err(ExerciseError::SurfaceBusy(self.phase));
        }
        self.session.state_mut().select_cell(id)?;
        self.invalidate();
        self.recorder.clear();
        self.session.state_mut().clear_scratch();
        self.phase = SurfacePhase::Drawing;
        Ok(())
    }

    /// Reveal the focused cell's expected digit; counts as a hint.
    pub fn reveal_hint(&mut self) -> Option<u8> {
        if self.phase.accepts_input() {
            self.session.reveal_hint()
        } else {
            None
        }
    }

    /// Replace the solved problem with the next one.
    ///
    /// # Errors
    ///
    /// Returns [`ExerciseError::SurfaceBusy`] unless a problem was just
    /// solved, and generation errors otherwise.
    pub fn advance_problem(&mut self) -> ExerciseResult<()> {
        if self.phase != SurfacePhase::Transition {
            return Err(ExerciseError::SurfaceBusy(self.phase));
        }
        self.session.next_problem()?;
        self.invalidate();
        self.recorder.clear();
        self.phase = SurfacePhase::Drawing;
        tracing::info!(
            "Problem {} of level {}: {}",
            self.session.problem_index() + 1,
            self.session.level().id,
            self.state().problem()
        );
        Ok(())
    }

    fn submit_digit(&mut self, digit: u8) -> ExerciseResult<LevelEvent> {
        self.phase = SurfacePhase::Drawing;
        let event = self.session.submit(digit)?;
        self.recorder.clear();
        self.progress.increment_moves();

        match &event {
            LevelEvent::Advanced { .. } => self.messenger.cue(MessageTrigger::GoodProgress),
            LevelEvent::WrongDigit { .. } => {
                self.progress.record_invalid_move();
                self.messenger.cue(MessageTrigger::InvalidMove);
            }
            LevelEvent::ProblemSolved { solved, remaining } => {
                tracing::info!("Problem solved ({solved} done, {remaining} to go)");
                self.messenger.cue(MessageTrigger::GoodProgress);
                self.phase = SurfacePhase::Transition;
            }
            LevelEvent::LevelWon(record) => {
                self.progress.record_completion(record);
                self.messenger.cue(MessageTrigger::Victory);
                self.phase = SurfacePhase::Finished;
            }
        }
        Ok(event)
    }

    fn ensure_drawing(&self) -> ExerciseResult<()> {
        if self.phase.accepts_input() {
            Ok(())
        } else {
            Err(ExerciseError::SurfaceBusy(self.phase))
        }
    }

    fn invalidate(&mut self) {
        if let Some(ticket) = self.outstanding.take() {
            tracing::debug!("Cancelled recognition #{}", ticket.sequence);
        }
        self.pending_digit = None;
    }
}
