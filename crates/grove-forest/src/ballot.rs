//! The vote-tallying contract shared by all ballot boxes.

use std::fmt;

use crate::cat_ballot::CategoricalBallotBox;
use crate::error::ForestError;
use crate::feature::Feature;
use crate::num_ballot::{NumericBallotBox, WeightedSumBallotBox};

/// Which aggregation a [`BallotBox`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyerKind {
    /// Weighted mode vote over category labels.
    Categorical,
    /// Weighted mean of numeric votes.
    Numeric,
    /// Plain sum of weighted numeric votes.
    WeightedSum,
}

impl fmt::Display for TallyerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TallyerKind::Categorical => "categorical",
            TallyerKind::Numeric => "numeric",
            TallyerKind::WeightedSum => "weighted-sum",
        };
        f.write_str(name)
    }
}

/// A per-case vote accumulator, one of three closed variants.
///
/// Trees cast votes through a shared reference from many threads at once;
/// the variant is chosen once per prediction and every call dispatches by
/// `match`.
#[derive(Debug)]
pub enum BallotBox {
    /// Classification: mode of label votes.
    Categorical(CategoricalBallotBox),
    /// Bagged regression: mean of numeric votes.
    Numeric(NumericBallotBox),
    /// Boosting: sum of pre-scaled numeric votes.
    WeightedSum(WeightedSumBallotBox),
}

impl BallotBox {
    /// Create an empty ballot box of the given kind for `n_cases` cases.
    #[must_use]
    pub fn new(kind: TallyerKind, n_cases: usize) -> Self {
        match kind {
            TallyerKind::Categorical => BallotBox::Categorical(CategoricalBallotBox::new(n_cases)),
            TallyerKind::Numeric => BallotBox::Numeric(NumericBallotBox::new(n_cases)),
            TallyerKind::WeightedSum => BallotBox::WeightedSum(WeightedSumBallotBox::new(n_cases)),
        }
    }

    /// Return the aggregation kind.
    #[must_use]
    pub fn kind(&self) -> TallyerKind {
        match self {
            BallotBox::Categorical(_) => TallyerKind::Categorical,
            BallotBox::Numeric(_) => TallyerKind::Numeric,
            BallotBox::WeightedSum(_) => TallyerKind::WeightedSum,
        }
    }

    /// Return the number of cases.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        match self {
            BallotBox::Categorical(bb) => bb.n_cases(),
            BallotBox::Numeric(bb) => bb.n_cases(),
            BallotBox::WeightedSum(bb) => bb.n_cases(),
        }
    }

    /// Register a vote of `weight` that `case` should be predicted as `pred`.
    ///
    /// Numeric variants parse `pred` as a number and ignore it if that fails.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    pub fn cast_vote(&self, case: usize, pred: &str, weight: f64) {
        match self {
            BallotBox::Categorical(bb) => bb.cast_vote(case, pred, weight),
            BallotBox::Numeric(bb) => bb.cast_vote(case, pred, weight),
            BallotBox::WeightedSum(bb) => bb.cast_vote(case, pred, weight),
        }
    }

    /// Return the categorical verdict for `case`.
    ///
    /// `"NA"` for an unvoted categorical case; empty for numeric variants.
    #[must_use]
    pub fn tally(&self, case: usize) -> String {
        match self {
            BallotBox::Categorical(bb) => bb.tally(case),
            BallotBox::Numeric(bb) => bb.tally(case),
            BallotBox::WeightedSum(bb) => bb.tally(case),
        }
    }

    /// Return the numeric verdict for `case`; `NaN` for the categorical variant.
    #[must_use]
    pub fn tally_numeric(&self, case: usize) -> f64 {
        match self {
            BallotBox::Categorical(bb) => bb.tally_numeric(case),
            BallotBox::Numeric(bb) => bb.tally_numeric(case),
            BallotBox::WeightedSum(bb) => bb.tally_numeric(case),
        }
    }

    /// Score the tallied verdicts against a ground-truth feature.
    ///
    /// Balanced classification error for the categorical variant, mean
    /// squared error for the numeric ones.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::FeatureKindMismatch`] when the feature kind
    /// does not match the ballot box kind.
    pub fn tally_error(&self, truth: &Feature) -> Result<f64, ForestError> {
        match (self, truth) {
            (BallotBox::Categorical(bb), Feature::Categorical(f)) => Ok(bb.tally_error(f)),
            (BallotBox::Numeric(bb), Feature::Numeric(f)) => Ok(bb.tally_error(f)),
            (BallotBox::WeightedSum(bb), Feature::Numeric(f)) => Ok(bb.tally_error(f)),
            (bb, f) => Err(ForestError::FeatureKindMismatch {
                tallyer: bb.kind(),
                feature: f.kind(),
                name: f.name().to_string(),
            }),
        }
    }
}
