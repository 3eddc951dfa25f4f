//! Prediction: every tree votes into one ballot box, then each case is tallied.

use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::ballot::{BallotBox, TallyerKind};
use crate::config::ForestType;
use crate::error::ForestError;
use crate::feature::FeatureMatrix;
use crate::forest::Forest;

/// Per-case predictions. Exactly one representation is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// Category labels from a classifier; `"NA"` where no tree voted.
    Categorical(Vec<String>),
    /// Real values from a regressor or a boosted ensemble.
    Real(Vec<f64>),
}

impl Predictions {
    /// Return `true` for real-valued predictions.
    #[must_use]
    pub fn is_real(&self) -> bool {
        matches!(self, Predictions::Real(_))
    }

    /// Return the number of cases predicted.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Predictions::Categorical(v) => v.len(),
            Predictions::Real(v) => v.len(),
        }
    }

    /// Return `true` if there are no predictions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the prediction for `case` as text.
    ///
    /// # Panics
    ///
    /// Panics if `case` is out of range.
    #[must_use]
    pub fn get_str(&self, case: usize) -> String {
        match self {
            Predictions::Categorical(v) => v[case].clone(),
            Predictions::Real(v) => v[case].to_string(),
        }
    }
}

/// Numerically stable inverse logit, kept strictly inside `(0, 1)`.
#[must_use]
pub fn expit(x: f64) -> f64 {
    let p = if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    };
    p.clamp(f64::EPSILON, 1.0 - f64::EPSILON)
}

/// Choose the ballot box that matches how `forest` combines votes.
///
/// Boosted forests sum their votes. Otherwise classifiers take the weighted
/// mode and regressors the weighted mean.
#[must_use]
pub fn select_tallyer(fm: &FeatureMatrix, forest: &Forest) -> BallotBox {
    let kind = if forest.config.is_boosted() {
        TallyerKind::WeightedSum
    } else {
        match forest.forest_type() {
            ForestType::Classifier => TallyerKind::Categorical,
            ForestType::Regressor => TallyerKind::Numeric,
        }
    };
    BallotBox::new(kind, fm.n_cases())
}

/// Have every tree of `forest` vote on every case of `fm`.
///
/// # Errors
///
/// Returns the first error any tree reports, such as
/// [`ForestError::MissingFeature`].
#[instrument(skip_all, fields(n_trees = forest.n_trees(), n_cases = fm.n_cases()))]
pub fn cast_votes(fm: &FeatureMatrix, forest: &Forest) -> Result<BallotBox, ForestError> {
    // Bind every splitter first so a bad matrix fails before any vote lands.
    for name in forest.splitters() {
        if fm.feature(name).is_none() {
            return Err(ForestError::MissingFeature {
                name: name.to_string(),
            });
        }
    }

    let ballots = select_tallyer(fm, forest);
    if let BallotBox::Categorical(cat) = &ballots {
        // Codes follow tree order, then node order, before trees vote in parallel.
        cat.register_labels(forest.trees.iter().flat_map(|tree| tree.vote_labels()));
    }
    forest
        .trees
        .par_iter()
        .try_for_each(|tree| tree.vote(fm, &ballots))?;
    debug!(tallyer = %ballots.kind(), "votes cast");
    Ok(ballots)
}

/// Predict every case of `fm` with `forest`.
///
/// Categorical ballot boxes yield labels. Numeric and weighted-sum ballot
/// boxes yield the tally plus the forest intercept; boosted forests with
/// `expit` set then map that through [`expit`].
///
/// # Errors
///
/// Returns [`ForestError::MissingFeature`] or
/// [`ForestError::SplitterKindMismatch`] when `fm` does not fit the trees.
#[instrument(skip_all, fields(n_trees = forest.n_trees(), n_cases = fm.n_cases()))]
pub fn predict(fm: &FeatureMatrix, forest: &Forest) -> Result<Predictions, ForestError> {
    let ballots = cast_votes(fm, forest)?;
    let n = fm.n_cases();
    let intercept = forest.intercept;

    let predictions = match ballots.kind() {
        TallyerKind::Categorical => Predictions::Categorical(
            (0..n).into_par_iter().map(|case| ballots.tally(case)).collect(),
        ),
        TallyerKind::Numeric => Predictions::Real(
            (0..n)
                .into_par_iter()
                .map(|case| ballots.tally_numeric(case) + intercept)
                .collect(),
        ),
        TallyerKind::WeightedSum => {
            let link = forest.config.expit;
            Predictions::Real(
                (0..n)
                    .into_par_iter()
                    .map(|case| {
                        let raw = ballots.tally_numeric(case) + intercept;
                        if link { expit(raw) } else { raw }
                    })
                    .collect(),
            )
        }
    };

    info!(n_cases = n, real = predictions.is_real(), "prediction complete");
    Ok(predictions)
}

/// Share of vote weight each case gave the forest's positive class.
///
/// Cases with no votes yield `NaN`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::NotAClassifier`] | the forest is not a plain classifier |
/// | [`ForestError::MissingPositiveClass`] | no positive class is configured |
/// | [`ForestError::MissingFeature`] | a splitter is absent from `fm` |
pub fn predict_probabilities(fm: &FeatureMatrix, forest: &Forest) -> Result<Vec<f64>, ForestError> {
    if forest.forest_type() != ForestType::Classifier || forest.config.is_boosted() {
        return Err(ForestError::NotAClassifier);
    }
    let positive = forest
        .config
        .positive()
        .ok_or(ForestError::MissingPositiveClass)?;

    let ballots = cast_votes(fm, forest)?;
    let BallotBox::Categorical(cat) = &ballots else {
        return Err(ForestError::NotAClassifier);
    };
    Ok((0..fm.n_cases())
        .into_par_iter()
        .map(|case| cat.tally_share(case, positive))
        .collect())
}
