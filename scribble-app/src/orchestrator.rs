//! Async wiring of the exercise: classifier round-trips, the confirmation
//! timer and the pause between problems.
//!
//! The exercise lock is released while the classifier runs, so the child can
//! change cells mid-recognition; the ticket check then discards the late
//! result. Timers are tasks that are aborted when superseded or when the
//! orchestrator is dropped.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use scribble_classifier::Classify;
use scribble_core::{CellId, LevelEvent, Path};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::error::ExerciseResult;
use crate::exercise::{Exercise, RecognitionOutcome, RecognitionTicket};

/// Notifications for the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseEvent {
    /// Classifier output was applied to the focused cell.
    Recognized(RecognitionOutcome),
    /// A digit was submitted, automatically or from the pad.
    Submitted(LevelEvent),
    /// The next problem replaced the solved one.
    ProblemReady {
        /// Zero-based index of the new problem.
        index: u32,
    },
    /// The next problem could not be generated; the surface stays in
    /// transition until [`Orchestrator::advance_problem`] succeeds.
    ProblemFailed {
        /// Why generation failed.
        reason: String,
    },
}

#[derive(Default)]
struct Timers {
    confirm: Option<JoinHandle<()>>,
    transition: Option<JoinHandle<()>>,
}

impl Timers {
    fn abort_all(&mut self) {
        for handle in [self.confirm.take(), self.transition.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

struct Shared {
    exercise: Mutex<Exercise>,
    events: mpsc::UnboundedSender<ExerciseEvent>,
    timers: StdMutex<Timers>,
}

impl Shared {
    fn emit(&self, event: ExerciseEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Exercise event dropped: no listener");
        }
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_confirm(&self) {
        if let Some(handle) = self.timers().confirm.take() {
            handle.abort();
            tracing::debug!("Confirmation timer cancelled");
        }
    }
}

/// Drives an [`Exercise`] against a classifier.
pub struct Orchestrator {
    shared: Arc<Shared>,
    classifier: Arc<dyn Classify>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Wrap `exercise`; events are delivered on the returned receiver.
    #[must_use]
    pub fn new(
        exercise: Exercise,
        classifier: Arc<dyn Classify>,
    ) -> (Self, mpsc::UnboundedReceiver<ExerciseEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            exercise: Mutex::new(exercise),
            events,
            timers: StdMutex::new(Timers::default()),
        });
        (Self { shared, classifier }, rx)
    }

    /// Lock the exercise for inspection or direct manipulation.
    pub async fn exercise(&self) -> MutexGuard<'_, Exercise> {
        self.shared.exercise.lock().await
    }

    /// Add a finished stroke to the focused cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is not accepting input.
    pub async fn add_path(&self, path: Path) -> ExerciseResult<()> {
        self.shared.exercise.lock().await.add_path(path)
    }

    /// Classify the current drawing and apply the result.
    ///
    /// An accepted digit is submitted automatically after the confirmation
    /// window unless focus changes first.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is busy, nothing is focused, or
    /// nothing has been drawn.
    pub async fn recognize(&self) -> ExerciseResult<RecognitionOutcome> {
        let request = self.shared.exercise.lock().await.begin_recognition()?;

        let probabilities = self.classifier.classify(&request.image).await;

        let outcome = self
            .shared
            .exercise
            .lock()
            .await
            .complete_recognition(request.ticket, &probabilities);

        match outcome {
            RecognitionOutcome::Stale => {}
            RecognitionOutcome::Pending { ticket, delay, .. } => {
                schedule_confirm(&self.shared, ticket, delay);
                self.shared.emit(ExerciseEvent::Recognized(outcome));
            }
            RecognitionOutcome::Rejected | RecognitionOutcome::LowConfidence(_) => {
                self.shared.emit(ExerciseEvent::Recognized(outcome));
            }
        }
        Ok(outcome)
    }

    /// Submit a digit from the pad.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is busy or the digit is invalid.
    pub async fn submit_manual(&self, digit: u8) -> ExerciseResult<LevelEvent> {
        let mut exercise = self.shared.exercise.lock().await;
        let event = exercise.submit_manual(digit)?;
        let delay = exercise.config().next_problem_delay;
        self.shared.cancel_confirm();
        drop(exercise);

        settle(&self.shared, event.clone(), delay);
        Ok(event)
    }

    /// Focus another cell, cancelling any pending submission.
    ///
    /// A refused selection leaves the pending submission running.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell cannot take focus.
    pub async fn select_cell(&self, id: CellId) -> ExerciseResult<()> {
        let mut exercise = self.shared.exercise.lock().await;
        exercise.select_cell(id)?;
        self.shared.cancel_confirm();
        Ok(())
    }

    /// Discard the drawing, cancelling any pending submission.
    pub async fn clear_drawing(&self) {
        self.shared.cancel_confirm();
        self.shared.exercise.lock().await.clear_drawing();
    }

    /// Reveal the focused cell's expected digit.
    pub async fn reveal_hint(&self) -> Option<u8> {
        self.shared.exercise.lock().await.reveal_hint()
    }

    /// Start the next problem now, e.g. after [`ExerciseEvent::ProblemFailed`].
    ///
    /// Supersedes a scheduled transition.
    ///
    /// # Errors
    ///
    /// Returns an error unless a problem was just solved, or if generation
    /// fails again.
    pub async fn advance_problem(&self) -> ExerciseResult<u32> {
        let mut exercise = self.shared.exercise.lock().await;
        exercise.advance_problem()?;
        let index = exercise.session().problem_index();
        if let Some(handle) = self.shared.timers().transition.take() {
            handle.abort();
        }
        drop(exercise);
        self.shared.emit(ExerciseEvent::ProblemReady { index });
        Ok(index)
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shared.timers().abort_all();
    }
}

fn schedule_confirm(shared: &Arc<Shared>, ticket: RecognitionTicket, delay: Duration) {
    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut exercise = task_shared.exercise.lock().await;
        match exercise.confirm(ticket) {
            Ok(event) => {
                let next_delay = exercise.config().next_problem_delay;
                drop(exercise);
                settle(&task_shared, event, next_delay);
            }
            Err(e) => tracing::debug!("Confirmation skipped: {e}"),
        }
    });

    if let Some(previous) = shared.timers().confirm.replace(handle) {
        previous.abort();
    }
}

/// Report a submission and, if a problem was solved, schedule the next one.
fn settle(shared: &Arc<Shared>, event: LevelEvent, next_delay: Duration) {
    let solved = matches!(event, LevelEvent::ProblemSolved { .. });
    shared.emit(ExerciseEvent::Submitted(event));
    if !solved {
        return;
    }

    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(next_delay).await;
        let mut exercise = task_shared.exercise.lock().await;
        match exercise.advance_problem() {
            Ok(()) => {
                let index = exercise.session().problem_index();
                drop(exercise);
                task_shared.emit(ExerciseEvent::ProblemReady { index });
            }
            Err(e) => {
                drop(exercise);
                tracing::warn!("Could not start next problem: {e}");
                task_shared.emit(ExerciseEvent::ProblemFailed {
                    reason: e.to_string(),
                });
            }
        }
    });

    if let Some(previous) = shared.timers().transition.replace(handle) {
        previous.abort();
    }
}
