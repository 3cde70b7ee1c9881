//! Level catalogue loaded from content files.
//!
//! Validation runs at content-authoring time so an unsatisfiable
//! `(range, carry/borrow)` combination is reported before anyone plays it.

use std::path::Path as FsPath;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::problem::{CalculationProblem, GeneratorConfig, LevelConfig};

/// Largest operand-pair space analysed exhaustively.
const MAX_ANALYSED_PAIRS: u64 = 1_000_000;

/// Operand pairs drawn for levels too wide to enumerate.
const SAMPLED_PAIRS: u32 = 50_000;

/// Fixed so validation reports the same issues on every run.
const SAMPLING_SEED: u64 = 0x5C21_BB1E;

/// Acceptable probability that generation exhausts its attempt cap.
const MAX_EXHAUSTION_PROBABILITY: f64 = 1e-3;

/// Problem found while validating a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelIssue {
    /// The level is structurally invalid.
    Invalid {
        /// Level identifier.
        level: String,
        /// What is wrong.
        reason: String,
    },
    /// No operand pair in range meets the carry/borrow requirement.
    Unsatisfiable {
        /// Level identifier.
        level: String,
    },
    /// Valid pairs exist but are rare enough that generation may give up.
    Sparse {
        /// Level identifier.
        level: String,
        /// Fraction of operand pairs that qualify.
        ratio: f64,
    },
    /// Two levels share an id.
    DuplicateId {
        /// The repeated identifier.
        level: String,
    },
}

/// Ordered list of levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCatalog {
    /// Levels in play order.
    pub levels: Vec<LevelConfig>,
}

impl LevelCatalog {
    /// Parse a catalogue from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalogue from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<FsPath>) -> CoreResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a level by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LevelNotFound`] if no level has this id.
    pub fn get(&self, id: &str) -> CoreResult<&LevelConfig> {
        self.levels
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| CoreError::LevelNotFound(id.to_string()))
    }

    /// Check every level, returning all issues found.
    #[must_use]
    pub fn validate(&self, generator: &GeneratorConfig) -> Vec<LevelIssue> {
        let mut issues = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for level in &self.levels {
            if !seen.insert(level.id.as_str()) {
                issues.push(LevelIssue::DuplicateId {
                    level: level.id.clone(),
                });
            }
            if let Some(issue) = analyse_level(level, generator) {
                issues.push(issue);
            }
        }

        if !issues.is_empty() {
            tracing::warn!("Level catalogue has {} issue(s)", issues.len());
        }
        issues
    }
}

/// Check one level for structural validity and satisfiability.
#[must_use]
pub fn analyse_level(level: &LevelConfig, generator: &GeneratorConfig) -> Option<LevelIssue> {
    if let Err(e) = level.validate() {
        return Some(LevelIssue::Invalid {
            level: level.id.clone(),
            reason: e.to_string(),
        });
    }

    let span = u64::from(level.max_operand - level.min_operand) + 1;
    let ratio = if span.saturating_mul(span) > MAX_ANALYSED_PAIRS {
        tracing::debug!("Level {} too wide to enumerate, sampling", level.id);
        sampled_ratio(level)
    } else {
        qualifying_ratio(level)
    };
    if ratio <= 0.0 {
        return Some(LevelIssue::Unsatisfiable {
            level: level.id.clone(),
        });
    }

    let exhaustion = (1.0 - ratio).powf(f64::from(generator.max_attempts));
    if exhaustion > MAX_EXHAUSTION_PROBABILITY {
        return Some(LevelIssue::Sparse {
            level: level.id.clone(),
            ratio,
        });
    }
    None
}

fn qualifies(level: &LevelConfig, a: u32, b: u32) -> bool {
    CalculationProblem::new(level.operation, a, b).requires_carry_or_borrow()
        == level.requires_carry_or_borrow
}

/// Estimate of [`qualifying_ratio`] from seeded random pairs.
///
/// A level where no sampled pair qualifies is reported as unsatisfiable:
/// generation would almost surely give up on it too.
#[allow(clippy::cast_precision_loss)] // count <= SAMPLED_PAIRS
fn sampled_ratio(level: &LevelConfig) -> f64 {
    let mut rng = StdRng::seed_from_u64(SAMPLING_SEED);
    let range = level.min_operand..=level.max_operand;
    let qualifying = (0..SAMPLED_PAIRS)
        .filter(|_| qualifies(level, rng.gen_range(range.clone()), rng.gen_range(range.clone())))
        .count();
    qualifying as f64 / f64::from(SAMPLED_PAIRS)
}

/// Fraction of operand pairs in range that meet the carry/borrow requirement.
#[allow(clippy::cast_precision_loss)] // pair counts are bounded by MAX_ANALYSED_PAIRS
fn qualifying_ratio(level: &LevelConfig) -> f64 {
    let mut total = 0_u64;
    let mut qualifying = 0_u64;
    for a in level.min_operand..=level.max_operand {
        for b in level.min_operand..=level.max_operand {
            total += 1;
            if qualifies(level, a, b) {
                qualifying += 1;
            }
        }
    }
    qualifying as f64 / total as f64
}
