//! Running-mean and running-sum ballot boxes for regression and boosting.

use parking_lot::RwLock;
use tracing::trace;

use crate::feature::NumericFeature;

#[derive(Debug, Default, Clone, Copy)]
struct NumBallot {
    weighted_sum: f64,
    total_weight: f64,
}

/// Parse a leaf prediction into a number, dropping unparsable labels.
fn parse_vote(case: usize, label: &str) -> Option<f64> {
    match label.trim().parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            trace!(case, label, "dropping non-numeric vote");
            None
        }
    }
}

/// Mean squared error of `predict(case)` against `truth`.
///
/// Cases with a missing true value or a `NaN` prediction are skipped; with
/// nothing left to score the error is `NaN`.
fn mean_squared_error(truth: &NumericFeature, predict: impl Fn(usize) -> f64) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for case in 0..truth.len() {
        let Some(actual) = truth.get(case) else {
            continue;
        };
        let predicted = predict(case);
        if predicted.is_nan() {
            continue;
        }
        let d = predicted - actual;
        sum += d * d;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Averages weighted numeric votes per case (bagged regression).
#[derive(Debug)]
pub struct NumericBallotBox {
    ballots: Vec<RwLock<NumBallot>>,
}

impl NumericBallotBox {
    /// Create a ballot box with one empty ballot per case.
    #[must_use]
    pub fn new(n_cases: usize) -> Self {
        Self {
            ballots: (0..n_cases).map(|_| RwLock::new(NumBallot::default())).collect(),
        }
    }

    /// Return the number of cases.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.ballots.len()
    }

    /// Register a vote whose prediction is the text form of a number.
    ///
    /// Labels that do not parse as `f64` are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    pub fn cast_vote(&self, case: usize, label: &str, weight: f64) {
        if let Some(value) = parse_vote(case, label) {
            self.cast_value(case, value, weight);
        }
    }

    /// Register a numeric vote of `value` with `weight`.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    pub fn cast_value(&self, case: usize, value: f64, weight: f64) {
        let mut ballot = self.ballots[case].write();
        ballot.weighted_sum += value * weight;
        ballot.total_weight += weight;
    }

    /// Numeric boxes have no categorical verdict; always empty.
    #[must_use]
    pub fn tally(&self, _case: usize) -> String {
        String::new()
    }

    /// Return the weighted mean of the votes for `case`, `NaN` if none.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    #[must_use]
    pub fn tally_numeric(&self, case: usize) -> f64 {
        let ballot = *self.ballots[case].read();
        if ballot.total_weight == 0.0 {
            return f64::NAN;
        }
        ballot.weighted_sum / ballot.total_weight
    }

    /// Mean squared error against `truth`, skipping missing values.
    #[must_use]
    pub fn tally_error(&self, truth: &NumericFeature) -> f64 {
        mean_squared_error(truth, |case| self.tally_numeric(case))
    }
}

/// Sums weighted numeric votes per case (boosting).
///
/// Each tree's vote is already scaled by its learning rate or weight, so
/// the verdict is the plain sum rather than a mean.
#[derive(Debug)]
pub struct WeightedSumBallotBox {
    ballots: Vec<RwLock<f64>>,
}

impl WeightedSumBallotBox {
    /// Create a ballot box with a zero sum per case.
    #[must_use]
    pub fn new(n_cases: usize) -> Self {
        Self {
            ballots: (0..n_cases).map(|_| RwLock::new(0.0)).collect(),
        }
    }

    /// Return the number of cases.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.ballots.len()
    }

    /// Register a vote whose prediction is the text form of a number.
    ///
    /// Labels that do not parse as `f64` are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    pub fn cast_vote(&self, case: usize, label: &str, weight: f64) {
        if let Some(value) = parse_vote(case, label) {
            self.cast_value(case, value, weight);
        }
    }

    /// Add `value * weight` to the running sum for `case`.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    pub fn cast_value(&self, case: usize, value: f64, weight: f64) {
        *self.ballots[case].write() += value * weight;
    }

    /// Sum boxes have no categorical verdict; always empty.
    #[must_use]
    pub fn tally(&self, _case: usize) -> String {
        String::new()
    }

    /// Return the running sum for `case` (`0.0` if no votes).
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    #[must_use]
    pub fn tally_numeric(&self, case: usize) -> f64 {
        *self.ballots[case].read()
    }

    /// Mean squared error against `truth`, skipping missing values.
    #[must_use]
    pub fn tally_error(&self, truth: &NumericFeature) -> f64 {
        mean_squared_error(truth, |case| self.tally_numeric(case))
    }
}
