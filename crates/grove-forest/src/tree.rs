//! Arena decision trees and their text records.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::io::Write;

use tracing::{instrument, trace};

use crate::ballot::BallotBox;
use crate::error::ForestError;
use crate::feature::{CategoricalFeature, Feature, FeatureMatrix, NumericFeature};
use crate::node::{Node, NodeIndex, SplitRule};
use crate::record::{Record, RecordBuilder, join_labels, split_labels};

/// Default vote weight of a tree.
pub const DEFAULT_TREE_WEIGHT: f64 = 1.0;

const SPLITTER_NUMERIC: &str = "NUMERIC";
const SPLITTER_CATEGORICAL: &str = "CATEGORICAL";

/// An already-grown decision tree stored as a node arena.
///
/// The root is `nodes[0]`; every child index is greater than its parent's,
/// so the arena is acyclic by construction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) weight: f64,
}

/// A split resolved against the columns of one feature matrix.
enum BoundSplit<'a> {
    Numeric {
        values: &'a NumericFeature,
        threshold: f64,
    },
    Categorical {
        values: &'a CategoricalFeature,
        left: HashSet<usize>,
    },
}

/// Where a case goes next.
enum Route<'a> {
    Next(NodeIndex),
    Vote(Option<&'a str>),
}

impl DecisionTree {
    /// Build a tree from a node arena with the default weight.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTree`] when the arena is empty or a child
    /// index does not point past its parent and inside the arena.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, ForestError> {
        check_arena(0, &nodes)?;
        Ok(Self {
            nodes,
            weight: DEFAULT_TREE_WEIGHT,
        })
    }

    /// Check the arena invariants of a tree built outside [`Self::from_nodes`],
    /// reporting failures against position `tree` in its forest.
    pub(crate) fn validate(&self, tree: usize) -> Result<(), ForestError> {
        check_arena(tree, &self.nodes)
    }

    /// A single-leaf tree that votes `pred` for every case.
    #[must_use]
    pub fn constant(pred: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::Leaf { pred: pred.into() }],
            weight: DEFAULT_TREE_WEIGHT,
        }
    }

    /// Set the weight attached to every vote this tree casts.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Return the vote weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Return the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    /// Uses an iterative BFS approach.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((idx, d)) = queue.pop_front() {
            max_depth = max_depth.max(d);
            if let Node::Split {
                left,
                right,
                missing,
                ..
            } = &self.nodes[idx]
            {
                queue.push_back((left.index(), d + 1));
                queue.push_back((right.index(), d + 1));
                if let Some(m) = missing {
                    queue.push_back((m.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Return the names of all features this tree splits on.
    #[must_use]
    pub fn splitters(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(feature.as_str()),
                Node::Leaf { .. } => None,
            })
            .collect()
    }

    /// Every label this tree can vote, in node order.
    pub(crate) fn vote_labels(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(Node::pred)
    }

    /// Cast one weighted vote per case of `fm` into `ballots`.
    ///
    /// A case whose splitter value is missing follows the node's missing
    /// branch if it has one; otherwise it votes the split node's own
    /// prediction, or abstains when the node has none.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::MissingFeature`] | a splitter is not a column of `fm` |
    /// | [`ForestError::SplitterKindMismatch`] | a splitter column has the wrong kind for its rule |
    ///
    /// # Panics
    ///
    /// Panics if `ballots` has fewer cases than `fm`.
    #[instrument(skip_all, fields(n_nodes = self.nodes.len(), n_cases = fm.n_cases()))]
    pub fn vote(&self, fm: &FeatureMatrix, ballots: &BallotBox) -> Result<(), ForestError> {
        let bound = self.bind(fm)?;

        for case in 0..fm.n_cases() {
            let mut at = 0usize;
            loop {
                let route = match (&self.nodes[at], &bound[at]) {
                    (Node::Leaf { pred }, _) => Route::Vote(Some(pred.as_str())),
                    (
                        Node::Split {
                            left,
                            right,
                            missing,
                            pred,
                            ..
                        },
                        Some(split),
                    ) => match split.goes_left(case) {
                        Some(true) => Route::Next(*left),
                        Some(false) => Route::Next(*right),
                        None => match missing {
                            Some(m) => Route::Next(*m),
                            None => Route::Vote(pred.as_deref()),
                        },
                    },
                    (Node::Split { .. }, None) => unreachable!("every split node is bound"),
                };
                match route {
                    Route::Next(next) => at = next.index(),
                    Route::Vote(Some(pred)) => {
                        ballots.cast_vote(case, pred, self.weight);
                        break;
                    }
                    Route::Vote(None) => {
                        trace!(case, node = at, "case abstains at split with missing value");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve every split node against the columns of `fm`.
    fn bind<'a>(&self, fm: &'a FeatureMatrix) -> Result<Vec<Option<BoundSplit<'a>>>, ForestError> {
        self.nodes
            .iter()
            .map(|node| {
                let Node::Split { feature, rule, .. } = node else {
                    return Ok(None);
                };
                let column = fm.feature(feature).ok_or_else(|| ForestError::MissingFeature {
                    name: feature.clone(),
                })?;
                let bound = match (rule, column) {
                    (SplitRule::Numeric { threshold }, Feature::Numeric(values)) => {
                        BoundSplit::Numeric {
                            values,
                            threshold: *threshold,
                        }
                    }
                    (SplitRule::Categorical { left }, Feature::Categorical(values)) => {
                        let map = values.category_map();
                        BoundSplit::Categorical {
                            values,
                            left: left.iter().filter_map(|l| map.get_code(l)).collect(),
                        }
                    }
                    (SplitRule::Numeric { .. }, _) => {
                        return Err(ForestError::SplitterKindMismatch {
                            name: feature.clone(),
                            expected: "numeric",
                        });
                    }
                    (SplitRule::Categorical { .. }, _) => {
                        return Err(ForestError::SplitterKindMismatch {
                            name: feature.clone(),
                            expected: "categorical",
                        });
                    }
                };
                Ok(Some(bound))
            })
            .collect()
    }

    /// Write this tree as a `TREE` record followed by one `NODE` record per node.
    ///
    /// Nodes are written parent-first; each is addressed by its path from
    /// the root (`*`, then `L`, `R`, or `M` per step).
    pub(crate) fn write_records<W: Write>(&self, index: usize, out: &mut W) -> std::io::Result<()> {
        let header = RecordBuilder::new()
            .raw("TREE", index)
            .raw("WEIGHT", self.weight)
            .build();
        writeln!(out, "{header}")?;

        let mut stack = vec![(0usize, String::from("*"))];
        while let Some((idx, path)) = stack.pop() {
            let mut rec = RecordBuilder::new().raw("NODE", &path);
            if let Some(pred) = self.nodes[idx].pred() {
                rec = rec.text("PRED", pred);
            }
            if let Node::Split {
                feature,
                rule,
                left,
                right,
                missing,
                ..
            } = &self.nodes[idx]
            {
                rec = rec.text("SPLITTER", feature);
                rec = match rule {
                    SplitRule::Numeric { threshold } => rec
                        .raw("SPLITTERTYPE", SPLITTER_NUMERIC)
                        .raw("LEFTSPLIT", threshold),
                    SplitRule::Categorical { left } => rec
                        .raw("SPLITTERTYPE", SPLITTER_CATEGORICAL)
                        .text("LEFTSPLIT", &join_labels(left)),
                };
                if let Some(m) = missing {
                    stack.push((m.index(), format!("{path}M")));
                }
                stack.push((right.index(), format!("{path}R")));
                stack.push((left.index(), format!("{path}L")));
            }
            writeln!(out, "{}", rec.build())?;
        }
        Ok(())
    }

    /// Rebuild a tree from its `TREE` record and the `NODE` records after it.
    pub(crate) fn from_records(
        tree: usize,
        header: &Record,
        node_records: &[Record],
    ) -> Result<Self, ForestError> {
        let weight: f64 = match header.get("WEIGHT") {
            Some(_) => header.parse_field("WEIGHT")?,
            None => DEFAULT_TREE_WEIGHT,
        };
        let invalid = |reason: String| ForestError::InvalidTree { tree, reason };

        let mut drafts: Vec<Draft> = Vec::with_capacity(node_records.len());
        let mut by_path: HashMap<String, usize> = HashMap::with_capacity(node_records.len());

        for rec in node_records {
            let path = rec.head().to_string();
            if !path.starts_with('*') || !path[1..].chars().all(|c| matches!(c, 'L' | 'R' | 'M')) {
                return Err(invalid(format!("bad node path \"{path}\" on line {}", rec.line())));
            }
            if by_path.contains_key(&path) {
                return Err(invalid(format!("duplicate node path {path}")));
            }
            let idx = drafts.len();
            if path.len() > 1 {
                let parent_path = &path[..path.len() - 1];
                let Some(&parent) = by_path.get(parent_path) else {
                    return Err(invalid(format!("node {path} has no parent")));
                };
                let slot = match path.as_bytes()[path.len() - 1] {
                    b'L' => &mut drafts[parent].left,
                    b'R' => &mut drafts[parent].right,
                    _ => &mut drafts[parent].missing,
                };
                *slot = Some(NodeIndex::new(idx));
            }
            drafts.push(Draft::from_record(rec)?);
            by_path.insert(path, idx);
        }

        if drafts.is_empty() {
            return Err(invalid("tree has no nodes".to_string()));
        }

        let nodes = drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| d.finish().map_err(|reason| invalid(format!("node {i}: {reason}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes, weight })
    }
}

/// The root exists and every child index points past its parent and inside
/// the arena.
fn check_arena(tree: usize, nodes: &[Node]) -> Result<(), ForestError> {
    if nodes.is_empty() {
        return Err(ForestError::InvalidTree {
            tree,
            reason: "tree has no nodes".to_string(),
        });
    }
    for (i, node) in nodes.iter().enumerate() {
        if let Node::Split {
            left,
            right,
            missing,
            ..
        } = node
        {
            for child in [Some(*left), Some(*right), *missing].into_iter().flatten() {
                if child.index() <= i || child.index() >= nodes.len() {
                    return Err(ForestError::InvalidTree {
                        tree,
                        reason: format!("node {i} has invalid child {child}"),
                    });
                }
            }
        }
    }
    Ok(())
}

impl BoundSplit<'_> {
    /// `Some(true)` to go left, `Some(false)` to go right, `None` if missing.
    fn goes_left(&self, case: usize) -> Option<bool> {
        match self {
            BoundSplit::Numeric { values, threshold } => values.get(case).map(|v| v <= *threshold),
            BoundSplit::Categorical { values, left } => {
                values.get(case).map(|code| left.contains(&code))
            }
        }
    }
}

/// A node record whose children are still being collected.
struct Draft {
    pred: Option<String>,
    split: Option<(String, SplitRule)>,
    left: Option<NodeIndex>,
    right: Option<NodeIndex>,
    missing: Option<NodeIndex>,
}

impl Draft {
    fn from_record(rec: &Record) -> Result<Self, ForestError> {
        let pred = rec.get("PRED").map(str::to_string);
        let split = match rec.get("SPLITTER") {
            None => None,
            Some(feature) => {
                let rule = match rec.require("SPLITTERTYPE")? {
                    SPLITTER_NUMERIC => SplitRule::Numeric {
                        threshold: rec.parse_field("LEFTSPLIT")?,
                    },
                    SPLITTER_CATEGORICAL => SplitRule::Categorical {
                        left: split_labels(rec.require("LEFTSPLIT")?).into_iter().collect(),
                    },
                    other => {
                        return Err(ForestError::InvalidValue {
                            line: rec.line(),
                            field: "SPLITTERTYPE",
                            raw: other.to_string(),
                        });
                    }
                };
                Some((feature.to_string(), rule))
            }
        };
        Ok(Self {
            pred,
            split,
            left: None,
            right: None,
            missing: None,
        })
    }

    fn finish(self) -> Result<Node, String> {
        match self.split {
            Some((feature, rule)) => {
                let (Some(left), Some(right)) = (self.left, self.right) else {
                    return Err("split node needs both a left and a right child".to_string());
                };
                Ok(Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                    missing: self.missing,
                    pred: self.pred,
                })
            }
            None => {
                if self.left.is_some() || self.right.is_some() || self.missing.is_some() {
                    return Err("node has children but no splitter".to_string());
                }
                let pred = self.pred.ok_or_else(|| "leaf has no prediction".to_string())?;
                Ok(Node::Leaf { pred })
            }
        }
    }
}
