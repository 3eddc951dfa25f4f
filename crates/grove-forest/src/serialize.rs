//! Binary model files via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::Forest;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees, recorded for logging without walking the forest.
    n_trees: usize,
    /// The serialized forest.
    forest: Forest,
}

impl Forest {
    /// Save the forest to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            forest: self.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| ForestError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ForestError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), n_trees = envelope.n_trees, "model saved");
        Ok(())
    }

    /// Load a forest from a binary file, rejecting other format versions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ForestError::Truncated`] | recorded tree count disagrees with the trees decoded |
    /// | [`ForestError::InvalidTree`] | a tree's node arena is empty or not acyclic |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        // The version is the envelope's first field, so it can be checked
        // before the rest of the layout is trusted.
        let version: u32 =
            bincode::deserialize(&bytes).map_err(|e| ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;
        if version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: version,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        let forest = envelope.forest;
        if envelope.n_trees != forest.trees.len() {
            return Err(ForestError::Truncated {
                expected: envelope.n_trees,
                found: forest.trees.len(),
            });
        }
        for (i, tree) in forest.trees.iter().enumerate() {
            tree.validate(i)?;
        }

        debug!(n_trees = envelope.n_trees, "model loaded");
        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::{ForestType, PredictConfig};
    use crate::node::{Node, NodeIndex, SplitRule};
    use crate::tree::DecisionTree;

    fn classifier() -> Forest {
        let tree = DecisionTree::from_nodes(vec![
            Node::Split {
                feature: "C:color".into(),
                rule: SplitRule::Categorical {
                    left: ["red".to_string()].into_iter().collect(),
                },
                left: NodeIndex::new(1),
                right: NodeIndex::new(2),
                missing: Some(NodeIndex::new(3)),
                pred: None,
            },
            Node::Leaf { pred: "warm".into() },
            Node::Leaf { pred: "cool".into() },
            Node::Leaf { pred: "unknown".into() },
        ])
        .unwrap();
        let cfg = PredictConfig::new(ForestType::Classifier)
            .with_target("C:tone")
            .with_positive("warm");
        Forest::new(cfg, 0.0, vec![tree, DecisionTree::constant("cool").with_weight(0.5)])
    }

    #[test]
    fn round_trip_identical_forest() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");

        let forest = classifier();
        forest.save(&model_path).unwrap();
        let loaded = Forest::load(&model_path).unwrap();

        assert_eq!(loaded, forest);
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = Forest::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, [1u8, 0]).unwrap();
        let err = Forest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::DeserializeModel { .. }));
    }

    fn write_envelope(path: &Path, n_trees: usize, forest: Forest) {
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees,
            forest,
        };
        std::fs::write(path, bincode::serialize(&envelope).unwrap()).unwrap();
    }

    #[test]
    fn empty_tree_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty_tree.bin");
        let bad = DecisionTree {
            nodes: Vec::new(),
            weight: 1.0,
        };
        let forest = Forest::new(
            PredictConfig::new(ForestType::Classifier),
            0.0,
            vec![DecisionTree::constant("a"), bad],
        );
        forest.save(&path).unwrap();

        let err = Forest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTree { tree: 1, .. }));
    }

    #[test]
    fn cyclic_tree_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cyclic.bin");
        let looping = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: "N:x".into(),
                    rule: SplitRule::Numeric { threshold: 0.0 },
                    left: NodeIndex::new(0),
                    right: NodeIndex::new(1),
                    missing: None,
                    pred: None,
                },
                Node::Leaf { pred: "a".into() },
            ],
            weight: 1.0,
        };
        let forest = Forest::new(PredictConfig::new(ForestType::Classifier), 0.0, vec![looping]);
        write_envelope(&path, 1, forest);

        let err = Forest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTree { tree: 0, .. }));
    }

    #[test]
    fn tree_count_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.bin");
        write_envelope(&path, 5, classifier());

        let err = Forest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::Truncated { expected: 5, found: 2 }));
    }

    #[test]
    fn version_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        classifier().save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[..4].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = Forest::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ForestError::IncompatibleModelVersion { expected: FORMAT_VERSION, .. }
        ));
    }
}
