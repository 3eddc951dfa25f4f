//! A loaded forest: its training-time options, intercept, and trees.

use std::collections::BTreeSet;

use crate::config::{ForestType, PredictConfig};
use crate::tree::DecisionTree;

/// An already-trained ensemble ready for prediction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Forest {
    pub(crate) config: PredictConfig,
    pub(crate) intercept: f64,
    pub(crate) trees: Vec<DecisionTree>,
}

/// Shape statistics for a forest, suitable for reporting.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ForestSummary {
    /// Forest type tag.
    pub forest_type: String,
    /// Target feature name.
    pub target: String,
    /// Number of trees.
    pub n_trees: usize,
    /// Total nodes across all trees.
    pub n_nodes: usize,
    /// Total leaves across all trees.
    pub n_leaves: usize,
    /// Depth of the deepest tree.
    pub max_depth: usize,
    /// Constant added to numeric predictions.
    pub intercept: f64,
    /// Whether votes are summed as in a boosted ensemble.
    pub boosted: bool,
    /// Distinct splitter features, sorted.
    pub splitters: Vec<String>,
}

impl Forest {
    /// Assemble a forest from its parts.
    #[must_use]
    pub fn new(config: PredictConfig, intercept: f64, trees: Vec<DecisionTree>) -> Self {
        Self {
            config,
            intercept,
            trees,
        }
    }

    /// Return the training-time options.
    #[must_use]
    pub fn config(&self) -> &PredictConfig {
        &self.config
    }

    /// Return the forest type.
    #[must_use]
    pub fn forest_type(&self) -> ForestType {
        self.config.forest_type
    }

    /// Return the target feature name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.config.target
    }

    /// Return the intercept.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Return the trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return every feature name any tree splits on.
    #[must_use]
    pub fn splitters(&self) -> BTreeSet<&str> {
        self.trees.iter().flat_map(DecisionTree::splitters).collect()
    }

    /// Collect shape statistics.
    #[must_use]
    pub fn summary(&self) -> ForestSummary {
        ForestSummary {
            forest_type: self.forest_type().to_string(),
            target: self.target().to_string(),
            n_trees: self.n_trees(),
            n_nodes: self.trees.iter().map(DecisionTree::n_nodes).sum(),
            n_leaves: self.trees.iter().map(DecisionTree::n_leaves).sum(),
            max_depth: self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            intercept: self.intercept,
            boosted: self.config.is_boosted(),
            splitters: self.splitters().into_iter().map(str::to_string).collect(),
        }
    }
}
