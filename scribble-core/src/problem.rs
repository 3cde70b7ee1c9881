//! # Problem Generator
//!
//! Produces arithmetic problems that satisfy a level's operand range and
//! carry/borrow requirement by rejection sampling.
//!
//! Sampling is capped: a level whose range cannot satisfy its carry/borrow
//! requirement fails with [`CoreError::UnsatisfiableLevel`] instead of
//! looping forever.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Arithmetic operation of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// `operand1 + operand2`.
    Addition,
    /// `operand1 - operand2`, with `operand1 >= operand2`.
    Subtraction,
}

impl Operation {
    /// Written symbol of the operation.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Addition => '+',
            Self::Subtraction => '-',
        }
    }
}

/// A single written-calculation problem.
///
/// For subtraction the operands are ordered so the result is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationProblem {
    /// Top operand.
    pub operand1: u32,
    /// Bottom operand.
    pub operand2: u32,
    /// Operation applied.
    pub operation: Operation,
    /// Exact result.
    pub result: u64,
}

impl CalculationProblem {
    /// Build a problem, swapping subtraction operands so `operand1 >= operand2`.
    #[must_use]
    pub fn new(operation: Operation, a: u32, b: u32) -> Self {
        let (operand1, operand2) = match operation {
            Operation::Subtraction if a < b => (b, a),
            _ => (a, b),
        };
        let result = match operation {
            Operation::Addition => u64::from(operand1) + u64::from(operand2),
            Operation::Subtraction => u64::from(operand1 - operand2),
        };
        Self {
            operand1,
            operand2,
            operation,
            result,
        }
    }

    /// Whether working this problem column by column needs a carry
    /// (addition) or a borrow (subtraction).
    #[must_use]
    pub fn requires_carry_or_borrow(&self) -> bool {
        let (a, b) = (u64::from(self.operand1), u64::from(self.operand2));
        match self.operation {
            Operation::Addition => has_carry(a, b),
            Operation::Subtraction => has_borrow(a, b),
        }
    }
}

impl fmt::Display for CalculationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} = {}",
            self.operand1,
            self.operation.symbol(),
            self.operand2,
            self.result
        )
    }
}

/// Content definition of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Level identifier.
    pub id: String,
    /// Operation practised in this level.
    pub operation: Operation,
    /// Smallest operand (inclusive).
    pub min_operand: u32,
    /// Largest operand (inclusive).
    pub max_operand: u32,
    /// Whether every problem must (true) or must not (false) need a carry/borrow.
    pub requires_carry_or_borrow: bool,
    /// Number of problems to solve to win the level.
    pub problem_count: u32,
}

impl LevelConfig {
    /// Check the structural validity of this level.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLevel`] for an empty id, an inverted
    /// operand range or a zero problem count.
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::InvalidLevel("level id is empty".to_string()));
        }
        if self.min_operand > self.max_operand {
            return Err(CoreError::InvalidLevel(format!(
                "level '{}': min_operand {} exceeds max_operand {}",
                self.id, self.min_operand, self.max_operand
            )));
        }
        if self.problem_count == 0 {
            return Err(CoreError::InvalidLevel(format!(
                "level '{}': problem_count must be at least 1",
                self.id
            )));
        }
        Ok(())
    }
}

/// Configuration for problem generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum number of operand pairs drawn before giving up.
    pub max_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { max_attempts: 1000 }
    }
}

/// Rejection-sampling problem generator.
#[derive(Debug, Clone, Default)]
pub struct ProblemGenerator {
    config: GeneratorConfig,
}

impl ProblemGenerator {
    /// Create a generator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a problem for `level`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLevel`] if the level is malformed, or
    /// [`CoreError::UnsatisfiableLevel`] if no operand pair meeting the
    /// carry/borrow requirement is found within the attempt cap.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        level: &LevelConfig,
        rng: &mut R,
    ) -> CoreResult<CalculationProblem> {
        level.validate()?;

        for attempt in 1..=self.config.max_attempts {
            let a = rng.gen_range(level.min_operand..=level.max_operand);
            let b = rng.gen_range(level.min_operand..=level.max_operand);
            let problem = CalculationProblem::new(level.operation, a, b);

            if problem.requires_carry_or_borrow() == level.requires_carry_or_borrow {
                tracing::debug!("Generated {problem} for level {} (attempt {attempt})", level.id);
                return Ok(problem);
            }
        }

        tracing::warn!(
            "Level {} exhausted {} attempts without a valid problem",
            level.id,
            self.config.max_attempts
        );
        Err(CoreError::UnsatisfiableLevel {
            level: level.id.clone(),
            attempts: self.config.max_attempts,
        })
    }
}

/// Whether adding `a + b` produces a carry in any column.
///
/// Digits are processed least-significant first with a running carry.
#[must_use]
pub fn has_carry(mut a: u64, mut b: u64) -> bool {
    let mut carry = 0;
    while a > 0 || b > 0 {
        let sum = a % 10 + b % 10 + carry;
        if sum >= 10 {
            return true;
        }
        carry = sum / 10;
        a /= 10;
        b /= 10;
    }
    false
}

/// Number of columns of `a + b` that carry into the next column.
#[must_use]
pub fn carry_columns(mut a: u64, mut b: u64) -> usize {
    let mut carry = 0;
    let mut columns = 0;
    while a > 0 || b > 0 {
        let sum = a % 10 + b % 10 + carry;
        carry = sum / 10;
        if carry > 0 {
            columns += 1;
        }
        a /= 10;
        b /= 10;
    }
    columns
}

/// Whether `top - bottom` has a column whose top digit is smaller than
/// its bottom digit.
///
/// Columns are compared independently: a borrow taken from one column is
/// not carried into the next comparison.
#[must_use]
pub fn has_borrow(top: u64, bottom: u64) -> bool {
    borrow_columns(top, bottom) > 0
}

/// Number of columns of `top - bottom` whose top digit is smaller than the
/// bottom digit, compared column by column without propagation.
#[must_use]
pub fn borrow_columns(mut top: u64, mut bottom: u64) -> usize {
    let mut columns = 0;
    while top > 0 || bottom > 0 {
        if top % 10 < bottom % 10 {
            columns += 1;
        }
        top /= 10;
        bottom /= 10;
    }
    columns
}

/// Number of columns of `top - bottom` that borrow under long subtraction,
/// where each borrow reduces the next column's top digit.
#[must_use]
pub fn borrow_chain_columns(mut top: u64, mut bottom: u64) -> usize {
    let mut borrow = 0;
    let mut columns = 0;
    while top > 0 || bottom > 0 {
        if top % 10 < bottom % 10 + borrow {
            columns += 1;
            borrow = 1;
        } else {
            borrow = 0;
        }
        top /= 10;
        bottom /= 10;
    }
    columns
}
