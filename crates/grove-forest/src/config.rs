//! Forest type and the training-time options needed to predict correctly.

use std::fmt;
use std::str::FromStr;

use crate::error::ForestError;

/// The closed set of forest types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ForestType {
    /// Predicts category labels.
    Classifier,
    /// Predicts real values.
    Regressor,
}

impl ForestType {
    /// Return the tag used in model files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ForestType::Classifier => "Classifier",
            ForestType::Regressor => "Regressor",
        }
    }
}

impl fmt::Display for ForestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForestType {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Classifier" => Ok(ForestType::Classifier),
            "Regressor" => Ok(ForestType::Regressor),
            other => Err(ForestError::UnknownForestType {
                found: other.to_string(),
            }),
        }
    }
}

/// Options chosen at training time that prediction must honour.
///
/// Construct via [`PredictConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter    | Default   |
/// |--------------|-----------|
/// | `target`     | `""`      |
/// | string costs / weights / `blacklist` / `positive` | `""` |
/// | boolean flags | `false`  |
/// | `gradboost`  | `0.0` (no gradient boosting) |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictConfig {
    pub(crate) forest_type: ForestType,
    pub(crate) target: String,
    pub(crate) costs: String,
    pub(crate) dentropy: String,
    pub(crate) adacosts: String,
    pub(crate) rfweights: String,
    pub(crate) blacklist: String,
    pub(crate) l1: bool,
    pub(crate) density: bool,
    pub(crate) positive: String,
    pub(crate) entropy: bool,
    pub(crate) adaboost: bool,
    pub(crate) gradboost: f64,
    pub(crate) ordinal: bool,
    pub(crate) expit: bool,
}

impl PredictConfig {
    /// Create a config for the given forest type with every option off.
    #[must_use]
    pub fn new(forest_type: ForestType) -> Self {
        Self {
            forest_type,
            target: String::new(),
            costs: String::new(),
            dentropy: String::new(),
            adacosts: String::new(),
            rfweights: String::new(),
            blacklist: String::new(),
            l1: false,
            density: false,
            positive: String::new(),
            entropy: false,
            adaboost: false,
            gradboost: 0.0,
            ordinal: false,
            expit: false,
        }
    }

    // --- Setters ---

    /// Set the name of the target feature.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Set the JSON map of per-category misclassification costs.
    #[must_use]
    pub fn with_costs(mut self, costs: impl Into<String>) -> Self {
        self.costs = costs.into();
        self
    }

    /// Set the class disutilities used for disutility entropy.
    #[must_use]
    pub fn with_dentropy(mut self, dentropy: impl Into<String>) -> Self {
        self.dentropy = dentropy.into();
        self
    }

    /// Set the JSON costs for cost-sensitive AdaBoost.
    #[must_use]
    pub fn with_adacosts(mut self, adacosts: impl Into<String>) -> Self {
        self.adacosts = adacosts.into();
        self
    }

    /// Set the JSON map of per-category weights for weighted random forests.
    #[must_use]
    pub fn with_rfweights(mut self, rfweights: impl Into<String>) -> Self {
        self.rfweights = rfweights.into();
        self
    }

    /// Set the comma-separated list of features excluded from the predictors.
    #[must_use]
    pub fn with_blacklist(mut self, blacklist: impl Into<String>) -> Self {
        self.blacklist = blacklist.into();
        self
    }

    /// Use L1-norm regression.
    #[must_use]
    pub fn with_l1(mut self, l1: bool) -> Self {
        self.l1 = l1;
        self
    }

    /// Use density-estimating trees.
    #[must_use]
    pub fn with_density(mut self, density: bool) -> Self {
        self.density = density;
        self
    }

    /// Set the positive class label for probability output.
    #[must_use]
    pub fn with_positive(mut self, positive: impl Into<String>) -> Self {
        self.positive = positive.into();
        self
    }

    /// Use entropy-minimizing classification.
    #[must_use]
    pub fn with_entropy(mut self, entropy: bool) -> Self {
        self.entropy = entropy;
        self
    }

    /// Mark the forest as adaptively boosted.
    #[must_use]
    pub fn with_adaboost(mut self, adaboost: bool) -> Self {
        self.adaboost = adaboost;
        self
    }

    /// Set the gradient boosting learning rate; `0.0` disables it.
    #[must_use]
    pub fn with_gradboost(mut self, gradboost: f64) -> Self {
        self.gradboost = gradboost;
        self
    }

    /// Use ordinal regression.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: bool) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Apply the expit link to boosted predictions.
    #[must_use]
    pub fn with_expit(mut self, expit: bool) -> Self {
        self.expit = expit;
        self
    }

    // --- Getters ---

    /// Return the forest type.
    #[must_use]
    pub fn forest_type(&self) -> ForestType {
        self.forest_type
    }

    /// Return the target feature name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the misclassification costs.
    #[must_use]
    pub fn costs(&self) -> &str {
        &self.costs
    }

    /// Return the disutility-entropy class weights.
    #[must_use]
    pub fn dentropy(&self) -> &str {
        &self.dentropy
    }

    /// Return the cost-sensitive AdaBoost costs.
    #[must_use]
    pub fn adacosts(&self) -> &str {
        &self.adacosts
    }

    /// Return the weighted random forest category weights.
    #[must_use]
    pub fn rfweights(&self) -> &str {
        &self.rfweights
    }

    /// Return the raw blacklist string.
    #[must_use]
    pub fn blacklist(&self) -> &str {
        &self.blacklist
    }

    /// Return the blacklisted feature names, split on commas.
    #[must_use]
    pub fn blacklisted_features(&self) -> Vec<&str> {
        self.blacklist
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Return whether L1 regression was used.
    #[must_use]
    pub fn l1(&self) -> bool {
        self.l1
    }

    /// Return whether density estimation was used.
    #[must_use]
    pub fn density(&self) -> bool {
        self.density
    }

    /// Return the positive class label, if one is set.
    #[must_use]
    pub fn positive(&self) -> Option<&str> {
        (!self.positive.is_empty()).then_some(self.positive.as_str())
    }

    /// Return whether entropy-minimizing classification was used.
    #[must_use]
    pub fn entropy(&self) -> bool {
        self.entropy
    }

    /// Return whether AdaBoost was used.
    #[must_use]
    pub fn adaboost(&self) -> bool {
        self.adaboost
    }

    /// Return the gradient boosting learning rate.
    #[must_use]
    pub fn gradboost(&self) -> f64 {
        self.gradboost
    }

    /// Return whether ordinal regression was used.
    #[must_use]
    pub fn ordinal(&self) -> bool {
        self.ordinal
    }

    /// Return whether the expit link is applied.
    #[must_use]
    pub fn expit(&self) -> bool {
        self.expit
    }

    /// Return `true` if votes must be summed rather than averaged or counted.
    #[must_use]
    pub fn is_boosted(&self) -> bool {
        self.adaboost || self.gradboost != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forest_type_tags_round_trip() {
        for ft in [ForestType::Classifier, ForestType::Regressor] {
            assert_eq!(ft.to_string().parse::<ForestType>().unwrap(), ft);
        }
    }

    #[test]
    fn unknown_forest_type_named_in_error() {
        let err = "GBM".parse::<ForestType>().unwrap_err();
        assert!(matches!(err, ForestError::UnknownForestType { ref found } if found == "GBM"));
        assert!(err.to_string().contains("GBM"));
    }

    #[test]
    fn defaults_are_off() {
        let cfg = PredictConfig::new(ForestType::Regressor);
        assert!(!cfg.is_boosted());
        assert!(!cfg.expit());
        assert_eq!(cfg.positive(), None);
        assert_eq!(cfg.gradboost(), 0.0);
        assert!(cfg.blacklisted_features().is_empty());
    }

    #[test]
    fn boosting_flags() {
        assert!(PredictConfig::new(ForestType::Classifier).with_adaboost(true).is_boosted());
        assert!(PredictConfig::new(ForestType::Regressor).with_gradboost(0.1).is_boosted());
    }

    #[test]
    fn blacklist_split_on_commas() {
        let cfg = PredictConfig::new(ForestType::Regressor).with_blacklist("N:a, C:b,,N:c");
        assert_eq!(cfg.blacklisted_features(), vec!["N:a", "C:b", "N:c"]);
    }
}
