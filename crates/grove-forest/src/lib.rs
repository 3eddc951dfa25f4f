//! Prediction core for already-trained tree ensembles.
//!
//! Trees vote concurrently into a shared ballot box, one accumulator per
//! case, which then tallies each case into a label or a real value. Forests
//! are read from and written to a line-oriented text format or a versioned
//! binary envelope.

mod ballot;
mod cat_ballot;
mod catmap;
mod codec;
mod config;
mod error;
mod feature;
mod forest;
mod node;
mod num_ballot;
mod predict;
mod record;
mod serialize;
mod tree;

pub use ballot::{BallotBox, TallyerKind};
pub use cat_ballot::CategoricalBallotBox;
pub use catmap::CategoryMap;
pub use codec::{ForestReader, ForestWriter, TEXT_FORMAT_VERSION};
pub use config::{ForestType, PredictConfig};
pub use error::ForestError;
pub use feature::{CategoricalFeature, Feature, FeatureMatrix, MISSING_LABEL, NumericFeature};
pub use forest::{Forest, ForestSummary};
pub use node::{Node, NodeIndex, SplitRule};
pub use num_ballot::{NumericBallotBox, WeightedSumBallotBox};
pub use predict::{Predictions, cast_votes, expit, predict, predict_probabilities, select_tallyer};
pub use serialize::FORMAT_VERSION;
pub use tree::{DEFAULT_TREE_WEIGHT, DecisionTree};
