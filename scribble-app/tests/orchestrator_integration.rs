//! Orchestrator Integration Tests
//!
//! Runs the exercise against stub classifiers on a paused clock:
//! - Accepted digits are submitted after the confirmation window
//! - Focus changes cancel pending submissions and discard late results
//! - Solved problems are replaced after the transition pause
//! - Timers die with the orchestrator

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scribble_app::{
    Exercise, ExerciseConfig, ExerciseError, ExerciseEvent, Orchestrator, RecognitionOutcome,
    SurfacePhase,
};
use scribble_classifier::Classify;
use scribble_core::{
    CellId, CoreError, GeneratorConfig, LevelConfig, LevelEvent, LevelSession, NullMessenger,
    Operation, Path, Point, ProblemGenerator, RecordingProgress, DIGIT_CLASSES,
};
use scribble_raster::RasterImage;
use tokio::sync::{mpsc, Notify};

/// Always answers with the same distribution.
struct FixedClassifier([f32; DIGIT_CLASSES]);

#[async_trait]
impl Classify for FixedClassifier {
    async fn classify(&self, _image: &RasterImage) -> [f32; DIGIT_CLASSES] {
        self.0
    }
}

/// Answers only once the test opens the gate.
struct GatedClassifier {
    probabilities: [f32; DIGIT_CLASSES],
    entered: Arc<Notify>,
    gate: Arc<Notify>,
}

#[async_trait]
impl Classify for GatedClassifier {
    async fn classify(&self, _image: &RasterImage) -> [f32; DIGIT_CLASSES] {
        self.entered.notify_one();
        self.gate.notified().await;
        self.probabilities
    }
}

fn peaked(digit: u8) -> [f32; DIGIT_CLASSES] {
    let mut probs = [0.01; DIGIT_CLASSES];
    probs[usize::from(digit)] = 0.91;
    probs
}

fn level(min_operand: u32, max_operand: u32, problem_count: u32) -> LevelConfig {
    LevelConfig {
        id: "orchestrated".to_string(),
        operation: Operation::Addition,
        min_operand,
        max_operand,
        requires_carry_or_borrow: false,
        problem_count,
    }
}

fn exercise(level: LevelConfig, progress: &Arc<RecordingProgress>) -> Exercise {
    let session = LevelSession::new(
        level,
        ProblemGenerator::new(),
        Box::new(StdRng::seed_from_u64(11)),
    )
    .unwrap();
    exercise_for(session, progress)
}

fn exercise_for(session: LevelSession, progress: &Arc<RecordingProgress>) -> Exercise {
    Exercise::new(
        session,
        ExerciseConfig::default(),
        progress.clone(),
        Arc::new(NullMessenger),
    )
}

fn focused_expected(exercise: &Exercise) -> u8 {
    exercise.state().current_cell().unwrap().expected_value().unwrap()
}

fn operand_cell(exercise: &Exercise) -> CellId {
    exercise
        .state()
        .cells()
        .iter()
        .find(|c| !c.is_editable())
        .map(|c| c.id())
        .unwrap()
}

fn tens_cell(exercise: &Exercise) -> CellId {
    exercise
        .state()
        .editable_cells()
        .find(|c| c.column() == 1)
        .map(|c| c.id())
        .unwrap()
}

fn stroke() -> Path {
    Path::new(
        vec![
            Point::new(150.0, 40.0),
            Point::new(150.0, 150.0),
            Point::new(150.0, 260.0),
        ],
        0,
    )
    .unwrap()
}

fn drain(events: &mut mpsc::UnboundedReceiver<ExerciseEvent>) -> Vec<ExerciseEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

// ============================================================================
// Confirmation Window
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_accepted_digit_submits_after_window() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(1, 4, 1), &progress);
    let digit = focused_expected(&exercise);
    let (orchestrator, mut events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier(peaked(digit))));

    orchestrator.add_path(stroke()).await.unwrap();
    let outcome = orchestrator.recognize().await.unwrap();
    assert!(matches!(outcome, RecognitionOutcome::Pending { result, .. } if result.digit() == Some(digit)));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Confirming);
    assert_eq!(progress.moves(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Finished);
    assert_eq!(progress.moves(), 1);
    assert_eq!(progress.completions().len(), 1);

    let drained = drain(&mut events);
    assert_eq!(drained.len(), 2);
    assert!(matches!(drained[0], ExerciseEvent::Recognized(RecognitionOutcome::Pending { .. })));
    assert!(matches!(drained[1], ExerciseEvent::Submitted(LevelEvent::LevelWon(_))));
}

#[tokio::test(start_paused = true)]
async fn test_low_confidence_schedules_nothing() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(1, 4, 1), &progress);
    let (orchestrator, mut events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier([0.1; DIGIT_CLASSES])));

    orchestrator.add_path(stroke()).await.unwrap();
    let outcome = orchestrator.recognize().await.unwrap();
    assert!(matches!(outcome, RecognitionOutcome::LowConfidence(r) if r.digit() == Some(0)));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Drawing);
    assert_eq!(progress.moves(), 0);
    assert_eq!(drain(&mut events).len(), 1);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_focus_change_cancels_pending_submission() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(10, 44, 1), &progress);
    let digit = focused_expected(&exercise);
    let tens = tens_cell(&exercise);
    let (orchestrator, mut events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier(peaked(digit))));

    orchestrator.add_path(stroke()).await.unwrap();
    orchestrator.recognize().await.unwrap();
    orchestrator.select_cell(tens).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    let exercise = orchestrator.exercise().await;
    assert_eq!(exercise.phase(), SurfacePhase::Drawing);
    assert_eq!(exercise.state().current_cell_id(), Some(tens));
    assert!(exercise.state().active_paths().is_empty());
    drop(exercise);
    assert_eq!(progress.moves(), 0);

    let drained = drain(&mut events);
    assert_eq!(drained.len(), 1, "only the recognition is reported: {drained:?}");
}

#[tokio::test(start_paused = true)]
async fn test_refused_actions_keep_pending_submission() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(1, 4, 1), &progress);
    let digit = focused_expected(&exercise);
    let operand = operand_cell(&exercise);
    let (orchestrator, _events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier(peaked(digit))));

    orchestrator.add_path(stroke()).await.unwrap();
    orchestrator.recognize().await.unwrap();

    assert!(matches!(
        orchestrator.select_cell(operand).await,
        Err(ExerciseError::Core(CoreError::CellNotEditable(_)))
    ));
    assert!(matches!(
        orchestrator.submit_manual(digit).await,
        Err(ExerciseError::SurfaceBusy(SurfacePhase::Confirming))
    ));

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Finished);
    assert_eq!(progress.moves(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_focus_change_during_classification_discards_result() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(10, 44, 1), &progress);
    let digit = focused_expected(&exercise);
    let tens = tens_cell(&exercise);

    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let classifier = GatedClassifier {
        probabilities: peaked(digit),
        entered: Arc::clone(&entered),
        gate: Arc::clone(&gate),
    };
    let (orchestrator, mut events) = Orchestrator::new(exercise, Arc::new(classifier));
    let orchestrator = Arc::new(orchestrator);

    orchestrator.add_path(stroke()).await.unwrap();
    let recognition = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.recognize().await }
    });

    entered.notified().await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Recognizing);
    orchestrator.select_cell(tens).await.unwrap();
    gate.notify_one();

    let outcome = recognition.await.unwrap().unwrap();
    assert_eq!(outcome, RecognitionOutcome::Stale);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Drawing);
    assert_eq!(progress.moves(), 0);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_orchestrator_aborts_timers() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(1, 4, 1), &progress);
    let digit = focused_expected(&exercise);
    let (orchestrator, _events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier(peaked(digit))));

    orchestrator.add_path(stroke()).await.unwrap();
    orchestrator.recognize().await.unwrap();
    drop(orchestrator);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(progress.moves(), 0);
}

// ============================================================================
// Progression
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_next_problem_follows_transition_pause() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(1, 4, 2), &progress);
    let digit = focused_expected(&exercise);
    let (orchestrator, mut events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier([0.0; DIGIT_CLASSES])));

    let event = orchestrator.submit_manual(digit).await.unwrap();
    assert_eq!(
        event,
        LevelEvent::ProblemSolved {
            solved: 1,
            remaining: 1
        }
    );
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Transition);

    tokio::time::sleep(Duration::from_millis(1400)).await;
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Transition);

    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let exercise = orchestrator.exercise().await;
        assert_eq!(exercise.phase(), SurfacePhase::Drawing);
        assert_eq!(exercise.session().problem_index(), 1);
    }

    let drained = drain(&mut events);
    assert_eq!(
        drained,
        vec![
            ExerciseEvent::Submitted(event),
            ExerciseEvent::ProblemReady { index: 1 },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unusable_distribution_is_rejected() {
    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise(level(1, 4, 1), &progress);
    let (orchestrator, _events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier([0.0; DIGIT_CLASSES])));

    orchestrator.add_path(stroke()).await.unwrap();
    let outcome = orchestrator.recognize().await.unwrap();
    assert_eq!(outcome, RecognitionOutcome::Rejected);

    let exercise = orchestrator.exercise().await;
    assert_eq!(exercise.phase(), SurfacePhase::Drawing);
    assert_eq!(exercise.state().active_paths().len(), 1, "drawing kept for another try");
}

#[tokio::test(start_paused = true)]
async fn test_failed_generation_is_reported_and_retried() {
    // One attempt per problem; find a seed whose first problem generates and
    // whose second does not.
    let level = level(1, 9, 2);
    let generator = ProblemGenerator::with_config(GeneratorConfig { max_attempts: 1 });
    let seed = (0..1000_u64)
        .find(|&seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            generator.generate(&level, &mut rng).is_ok()
                && generator.generate(&level, &mut rng).is_err()
        })
        .unwrap();
    let session =
        LevelSession::new(level, generator, Box::new(StdRng::seed_from_u64(seed))).unwrap();

    let progress = Arc::new(RecordingProgress::new());
    let exercise = exercise_for(session, &progress);
    let digit = focused_expected(&exercise);
    let (orchestrator, mut events) =
        Orchestrator::new(exercise, Arc::new(FixedClassifier([0.0; DIGIT_CLASSES])));

    orchestrator.submit_manual(digit).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1600)).await;

    let drained = drain(&mut events);
    assert_eq!(drained.len(), 2);
    assert!(matches!(drained[1], ExerciseEvent::ProblemFailed { .. }));
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Transition);

    let index = loop {
        match orchestrator.advance_problem().await {
            Ok(index) => break index,
            Err(ExerciseError::Core(CoreError::UnsatisfiableLevel { .. })) => {}
            Err(e) => panic!("unexpected error {e}"),
        }
    };
    assert_eq!(index, 1);
    assert_eq!(orchestrator.exercise().await.phase(), SurfacePhase::Drawing);
    assert!(matches!(drain(&mut events).last(), Some(ExerciseEvent::ProblemReady { index: 1 })));
    assert!(orchestrator.advance_problem().await.is_err());
}
