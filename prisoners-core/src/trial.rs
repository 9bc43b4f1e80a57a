//! Single-trial simulation of the cycle-following strategy.
//!
//! A trial builds a random permutation implicitly with a Fisher–Yates walk
//! and joins each position with the one it is swapped against. The
//! union-find components are exactly the permutation's cycles, so the trial
//! fails as soon as any component grows past the per-prisoner box budget.

use std::num::NonZeroUsize;

use crate::{Result, error::SimulationError, rng::BoundedDraw, union_find::DisjointSet};

/// Number of prisoners (and boxes) in the classic puzzle.
pub const DEFAULT_PRISONERS: usize = 100;

/// Problem size and box-opening budget for each trial.
///
/// # Examples
/// ```
/// use prisoners_core::TrialConfig;
///
/// let config = TrialConfig::default();
/// assert_eq!(config.prisoners(), 100);
/// assert_eq!(config.max_cycle_length(), 50);
///
/// let custom = TrialConfig::new(10, 9).expect("ten prisoners are valid");
/// assert_eq!(custom.max_cycle_length(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialConfig {
    prisoners: NonZeroUsize,
    max_cycle_length: usize,
}

impl TrialConfig {
    /// Creates a configuration for `prisoners` boxes where each prisoner may
    /// open at most `max_cycle_length` of them.
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidPrisoners`] when `prisoners` is zero.
    pub fn new(prisoners: usize, max_cycle_length: usize) -> Result<Self> {
        let prisoners = NonZeroUsize::new(prisoners)
            .ok_or(SimulationError::InvalidPrisoners { got: prisoners })?;
        Ok(Self {
            prisoners,
            max_cycle_length,
        })
    }

    /// Creates a configuration using the puzzle's budget of half the boxes.
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidPrisoners`] when `prisoners` is zero.
    pub fn with_half_budget(prisoners: usize) -> Result<Self> {
        Self::new(prisoners, prisoners / 2)
    }

    /// Number of prisoners and boxes.
    #[must_use]
    pub fn prisoners(&self) -> usize {
        self.prisoners.get()
    }

    /// Longest cycle a prisoner can follow to the end.
    #[must_use]
    pub fn max_cycle_length(&self) -> usize {
        self.max_cycle_length
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            prisoners: NonZeroUsize::new(DEFAULT_PRISONERS).unwrap_or(NonZeroUsize::MIN),
            max_cycle_length: DEFAULT_PRISONERS / 2,
        }
    }
}

/// Result of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Every prisoner found their own number.
    Success,
    /// At least one cycle was longer than the box budget.
    Failure,
}

impl TrialOutcome {
    /// Returns `true` for [`TrialOutcome::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// The outcome as a Bernoulli sample: 1 for success, 0 for failure.
    #[must_use]
    pub const fn as_count(self) -> u64 {
        match self {
            Self::Success => 1,
            Self::Failure => 0,
        }
    }
}

/// Runs one trial, drawing every swap index from `rng`.
///
/// # Examples
/// ```
/// use prisoners_core::{RandomSource, TrialConfig, TrialOutcome, run_trial};
///
/// // A budget covering every box can never be exceeded.
/// let config = TrialConfig::new(10, 10).expect("valid configuration");
/// let mut rng = RandomSource::from_seed(3);
/// assert_eq!(run_trial(&config, &mut rng), TrialOutcome::Success);
/// ```
pub fn run_trial<R: BoundedDraw + ?Sized>(config: &TrialConfig, rng: &mut R) -> TrialOutcome {
    let mut cycles = DisjointSet::with_elements(config.prisoners);
    for current in (1..config.prisoners()).rev() {
        let swapped = rng.next(current);
        if cycles.union(current, swapped) > config.max_cycle_length {
            return TrialOutcome::Failure;
        }
    }
    TrialOutcome::Success
}

/// Runs `trials` independent trials and returns how many succeeded.
pub fn count_successes<R: BoundedDraw + ?Sized>(
    config: &TrialConfig,
    rng: &mut R,
    trials: u64,
) -> u64 {
    (0..trials)
        .map(|_| run_trial(config, rng).as_count())
        .sum()
}

/// Exact success probability of the cycle-following strategy, when known in
/// closed form.
///
/// With a budget of at least half the boxes, at most one cycle can exceed it,
/// so the failure probability is `sum(1/k)` for `k` in
/// `max_cycle_length + 1 ..= prisoners`. Returns `None` for smaller budgets.
///
/// # Examples
/// ```
/// use prisoners_core::{TrialConfig, analytic_success_probability};
///
/// let p = analytic_success_probability(&TrialConfig::default()).expect("half budget is exact");
/// assert!((p - 0.311_827_82).abs() < 1e-8);
/// ```
#[must_use]
pub fn analytic_success_probability(config: &TrialConfig) -> Option<f64> {
    let prisoners = config.prisoners();
    let budget = config.max_cycle_length();
    if budget.saturating_mul(2) < prisoners {
        return None;
    }
    let failure: f64 = ((budget + 1)..=prisoners).map(|k| 1.0 / k as f64).sum();
    Some(1.0 - failure)
}
