//! Mode-vote ballot box for classification forests.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::catmap::CategoryMap;
use crate::feature::{CategoricalFeature, MISSING_LABEL};

/// Accumulated weight per category code for one case.
type CatBallot = HashMap<usize, f64>;

/// Collects weighted categorical votes per case and reduces them to a mode.
///
/// Each case has its own lock, so trees voting on different cases never
/// contend. Labels are translated to codes through an owned [`CategoryMap`].
#[derive(Debug)]
pub struct CategoricalBallotBox {
    categories: CategoryMap,
    ballots: Vec<RwLock<CatBallot>>,
}

impl CategoricalBallotBox {
    /// Create a ballot box with one empty ballot per case.
    #[must_use]
    pub fn new(n_cases: usize) -> Self {
        Self {
            categories: CategoryMap::new(),
            ballots: (0..n_cases).map(|_| RwLock::new(CatBallot::new())).collect(),
        }
    }

    /// Return the number of cases.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.ballots.len()
    }

    /// Return the map of labels seen in votes so far.
    #[must_use]
    pub fn category_map(&self) -> &CategoryMap {
        &self.categories
    }

    /// Assign codes to `labels` in iteration order, ahead of any vote.
    ///
    /// Ties go to the smallest code, so registering every label a forest can
    /// vote fixes the tie winner no matter how votes later interleave.
    pub fn register_labels<'a>(&self, labels: impl IntoIterator<Item = &'a str>) {
        for label in labels {
            self.categories.code_of(label);
        }
    }

    /// Register a vote of `weight` that `case` belongs to category `label`.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    pub fn cast_vote(&self, case: usize, label: &str, weight: f64) {
        let code = self.categories.code_of(label);
        let mut ballot = self.ballots[case].write();
        *ballot.entry(code).or_insert(0.0) += weight;
    }

    /// Return the category with the most accumulated weight for `case`.
    ///
    /// Ties go to the smallest category code. A case whose ballot holds no
    /// positive weight yields `"NA"`.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    #[must_use]
    pub fn tally(&self, case: usize) -> String {
        let mut winner = 0usize;
        let mut max_weight = 0.0f64;
        let mut ties: Vec<usize> = Vec::new();
        {
            let ballot = self.ballots[case].read();
            for (&code, &weight) in ballot.iter() {
                if weight > max_weight {
                    winner = code;
                    max_weight = weight;
                    ties.clear();
                }
                if weight == max_weight {
                    ties.push(code);
                }
            }
        }

        if max_weight <= 0.0 {
            return MISSING_LABEL.to_string();
        }
        if ties.len() > 1 {
            ties.sort_unstable();
            winner = ties[0];
        }
        self.categories.label_of(winner)
    }

    /// Return the share of `case`'s accumulated weight cast for `label`.
    ///
    /// Returns `NaN` when the case has no positive total weight, and `0.0`
    /// when `label` never received a vote for any case.
    ///
    /// # Panics
    ///
    /// Panics if `case >= n_cases()`.
    #[must_use]
    pub fn tally_share(&self, case: usize, label: &str) -> f64 {
        let code = self.categories.get_code(label);
        let ballot = self.ballots[case].read();
        let total: f64 = ballot.values().sum();
        if total <= 0.0 {
            return f64::NAN;
        }
        let votes = code.and_then(|c| ballot.get(&c)).copied().unwrap_or(0.0);
        votes / total
    }

    /// Categorical boxes have no numeric verdict; always `NaN`.
    #[must_use]
    pub fn tally_numeric(&self, _case: usize) -> f64 {
        f64::NAN
    }

    /// Balanced classification error against `truth`.
    ///
    /// Computes `1 - mean(correct_c / known_c)` over the categories of
    /// `truth`. Cases with a missing true value are ignored. Categories with
    /// no known case are left out of the mean; when no category has a known
    /// case the error is `NaN`.
    ///
    /// # Panics
    ///
    /// Panics if `truth` has more cases than this box.
    #[must_use]
    pub fn tally_error(&self, truth: &CategoricalFeature) -> f64 {
        let n_categories = truth.n_categories();
        let mut correct = vec![0usize; n_categories];
        let mut total = vec![0usize; n_categories];

        for case in 0..truth.len() {
            let Some(code) = truth.get(case) else {
                continue;
            };
            total[code] += 1;
            if truth.category_map().label_of(code) == self.tally(case) {
                correct[code] += 1;
            }
        }

        let accuracies: Vec<f64> = correct
            .iter()
            .zip(&total)
            .filter(|&(_, &known)| known > 0)
            .map(|(&hits, &known)| hits as f64 / known as f64)
            .collect();
        if accuracies.is_empty() {
            return f64::NAN;
        }
        1.0 - accuracies.iter().sum::<f64>() / accuracies.len() as f64
    }
}
