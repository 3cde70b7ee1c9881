//! # Recognition Policy
//!
//! Gates raw classifier output into an accepted or rejected recognition.
//!
//! Rules, in order:
//!
//! ```text
//! 1. fewer than `min_points` points       → Rejected (touch noise)
//! 2. distribution unusable (zeroed / NaN) → Rejected (inference failure)
//! 3. max probability < `min_confidence`   → LowConfidence (stay in draw state)
//! 4. otherwise                            → AutoSubmit after `confirmation_delay`
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stroke::Path;

/// Number of classes the classifier scores (digits 0–9).
pub const DIGIT_CLASSES: usize = 10;

/// A classified digit with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Recognized digit, or [`RecognitionResult::NO_DIGIT`].
    pub digit: i8,
    /// Probability assigned to `digit`, in `[0, 1]`.
    pub confidence: f32,
}

impl RecognitionResult {
    /// Sentinel digit meaning "nothing recognized".
    pub const NO_DIGIT: i8 = -1;

    /// The "no recognition" result.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            digit: Self::NO_DIGIT,
            confidence: 0.0,
        }
    }

    /// A recognized digit.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // digit is < 10
    pub fn new(digit: u8, confidence: f32) -> Self {
        debug_assert!(usize::from(digit) < DIGIT_CLASSES);
        Self {
            digit: digit as i8,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The digit, if one was recognized.
    #[must_use]
    pub fn digit(&self) -> Option<u8> {
        u8::try_from(self.digit).ok()
    }

    /// Whether a digit was recognized.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        self.digit >= 0
    }
}

/// What to do with a recognition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecognitionDecision {
    /// Not a real submission; the cell stays unset.
    Rejected,
    /// Recognized, but too uncertain to submit automatically.
    LowConfidence(RecognitionResult),
    /// Submit automatically once the confirmation window has elapsed.
    AutoSubmit {
        /// The accepted recognition.
        result: RecognitionResult,
        /// Visual confirmation window before submission.
        delay: Duration,
    },
}

impl RecognitionDecision {
    /// The recognition carried by this decision.
    #[must_use]
    pub const fn result(&self) -> RecognitionResult {
        match self {
            Self::Rejected => RecognitionResult::none(),
            Self::LowConfidence(result) | Self::AutoSubmit { result, .. } => *result,
        }
    }

    /// Whether this decision leads to an automatic submission.
    #[must_use]
    pub const fn is_auto_submit(&self) -> bool {
        matches!(self, Self::AutoSubmit { .. })
    }
}

/// Thresholds applied to classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionPolicy {
    /// Minimum number of points across all paths.
    pub min_points: usize,
    /// Minimum probability for automatic submission.
    pub min_confidence: f32,
    /// Delay between acceptance and submission.
    pub confirmation_delay: Duration,
}

impl Default for RecognitionPolicy {
    fn default() -> Self {
        Self {
            min_points: 3,
            min_confidence: 0.3,
            confirmation_delay: Duration::from_millis(600),
        }
    }
}

impl RecognitionPolicy {
    /// Decide what to do with `probabilities` computed from `paths`.
    #[must_use]
    pub fn decide(
        &self,
        paths: &[Path],
        probabilities: &[f32; DIGIT_CLASSES],
    ) -> RecognitionDecision {
        let points = Path::total_points(paths);
        if points < self.min_points {
            tracing::debug!("Rejecting recognition: only {points} points");
            return RecognitionDecision::Rejected;
        }

        let Some((digit, confidence)) = argmax(probabilities) else {
            tracing::debug!("Rejecting recognition: unusable distribution");
            return RecognitionDecision::Rejected;
        };
        let result = RecognitionResult::new(digit, confidence);

        if confidence < self.min_confidence {
            tracing::debug!("Low confidence {confidence:.3} for digit {digit}");
            return RecognitionDecision::LowConfidence(result);
        }

        RecognitionDecision::AutoSubmit {
            result,
            delay: self.confirmation_delay,
        }
    }

    /// Gate `probabilities` into a recognition result.
    ///
    /// Low-confidence results keep their digit and confidence but are not
    /// eligible for automatic submission; see [`Self::is_auto_submit_eligible`].
    #[must_use]
    pub fn accept(&self, paths: &[Path], probabilities: &[f32; DIGIT_CLASSES]) -> RecognitionResult {
        self.decide(paths, probabilities).result()
    }

    /// Whether `result` clears the confidence bar for automatic submission.
    #[must_use]
    pub fn is_auto_submit_eligible(&self, result: &RecognitionResult) -> bool {
        result.is_recognized() && result.confidence >= self.min_confidence
    }
}

/// Index and value of the largest probability. Ties go to the lower digit.
#[allow(clippy::cast_possible_truncation)] // index < DIGIT_CLASSES
fn argmax(probabilities: &[f32; DIGIT_CLASSES]) -> Option<(u8, f32)> {
    if probabilities.iter().any(|p| !p.is_finite()) {
        return None;
    }
    let (index, &max) = probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &f32)>, (i, p)| match best {
            Some((_, b)) if *b >= *p => best,
            _ => Some((i, p)),
        })?;
    (max > 0.0).then_some((index as u8, max))
}
