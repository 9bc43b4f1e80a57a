//! Bernoulli statistics over a batch of trials.
//!
//! Every trial contributes a 0/1 sample, so `sum(x_i^2)` equals the success
//! count and the unbiased sample variance reduces to
//! `successes * (1 - mean) / (trials - 1)`.

use crate::error::StatisticsError;

/// Two-sided 95% quantile of the standard normal distribution.
const Z_95: f64 = 1.96;

/// Normal-approximation confidence interval around the estimated mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    /// Lower bound of the interval.
    pub low: f64,
    /// Upper bound of the interval.
    pub high: f64,
}

impl ConfidenceInterval {
    /// Returns `true` when `value` lies inside the closed interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Mean, variance, and 95% confidence interval for a batch of trials.
///
/// `trials` is always the number of trials actually counted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsReport {
    trials: u64,
    successes: u64,
    mean: f64,
    variance: f64,
    confidence_interval: ConfidenceInterval,
}

impl StatisticsReport {
    /// Number of trials counted.
    #[must_use]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Number of successful trials.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Estimated success probability.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance of the Bernoulli outcomes.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// 95% confidence interval for the mean.
    #[must_use]
    pub fn confidence_interval(&self) -> ConfidenceInterval {
        self.confidence_interval
    }
}

/// Aggregates `successes` out of `trials` into a [`StatisticsReport`].
///
/// # Errors
/// Returns [`StatisticsError::NoTrials`] for zero trials,
/// [`StatisticsError::InsufficientSamples`] for a single trial (the variance
/// estimator divides by `trials - 1`), and
/// [`StatisticsError::SuccessesExceedTrials`] for inconsistent counts.
///
/// # Examples
/// ```
/// use prisoners_core::aggregate;
///
/// let report = aggregate(5, 10).expect("ten trials are enough");
/// assert_eq!(report.mean(), 0.5);
/// assert!(report.confidence_interval().contains(0.5));
/// ```
pub fn aggregate(successes: u64, trials: u64) -> Result<StatisticsReport, StatisticsError> {
    match trials {
        0 => return Err(StatisticsError::NoTrials),
        1 => return Err(StatisticsError::InsufficientSamples { trials }),
        _ => {}
    }
    if successes > trials {
        return Err(StatisticsError::SuccessesExceedTrials { successes, trials });
    }

    let n = trials as f64;
    let hits = successes as f64;
    let mean = hits / n;
    let variance = hits * (1.0 - mean) / (n - 1.0);
    let half_width = Z_95 * (variance / n).sqrt();

    Ok(StatisticsReport {
        trials,
        successes,
        mean,
        variance,
        confidence_interval: ConfidenceInterval {
            low: mean - half_width,
            high: mean + half_width,
        },
    })
}
