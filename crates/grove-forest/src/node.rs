//! Node arena types shared by every tree.

use std::collections::BTreeSet;
use std::fmt;

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a split node routes a case with a known value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitRule {
    /// Numeric splitter: values `<= threshold` go left.
    Numeric {
        /// Split threshold.
        threshold: f64,
    },
    /// Categorical splitter: labels in `left` go left, all others right.
    Categorical {
        /// Labels routed to the left child.
        left: BTreeSet<String>,
    },
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers, which keeps them cache-friendly and
/// trivially serializable.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Name of the feature the split tests.
        feature: String,
        /// Routing rule for known values.
        rule: SplitRule,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Child for cases whose splitter value is missing, if any.
        missing: Option<NodeIndex>,
        /// Vote cast for a missing value when there is no `missing` child.
        pred: Option<String>,
    },
    /// A terminal leaf node.
    Leaf {
        /// Predicted label or the text form of a numeric prediction.
        pred: String,
    },
}

impl Node {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return the prediction carried by this node, if any.
    #[must_use]
    pub fn pred(&self) -> Option<&str> {
        match self {
            Node::Leaf { pred } => Some(pred),
            Node::Split { pred, .. } => pred.as_deref(),
        }
    }
}
