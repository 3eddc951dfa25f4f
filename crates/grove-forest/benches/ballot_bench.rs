//! Criterion benchmarks for grove-forest: concurrent voting and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use grove_forest::{
    BallotBox, DecisionTree, Feature, FeatureMatrix, Forest, ForestType, Node, NodeIndex,
    NumericFeature, PredictConfig, SplitRule, TallyerKind, predict,
};

fn make_matrix(n_cases: usize, n_features: usize, seed: u64) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let features = (0..n_features)
        .map(|f| {
            let values = (0..n_cases).map(|_| Some(rng.r#gen::<f64>())).collect();
            Feature::Numeric(NumericFeature::new(format!("N:f{f}"), values))
        })
        .collect();
    let labels = (0..n_cases).map(|i| format!("case{i}")).collect();
    FeatureMatrix::new(labels, features).unwrap()
}

/// A complete tree of the given depth over random features and thresholds.
fn make_tree(depth: usize, n_features: usize, rng: &mut ChaCha8Rng) -> DecisionTree {
    let n_splits = (1usize << depth) - 1;
    let n_nodes = (1usize << (depth + 1)) - 1;
    let nodes = (0..n_nodes)
        .map(|i| {
            if i < n_splits {
                Node::Split {
                    feature: format!("N:f{}", rng.gen_range(0..n_features)),
                    rule: SplitRule::Numeric {
                        threshold: rng.r#gen(),
                    },
                    left: NodeIndex::new(2 * i + 1),
                    right: NodeIndex::new(2 * i + 2),
                    missing: None,
                    pred: None,
                }
            } else {
                Node::Leaf {
                    pred: format!("class{}", rng.gen_range(0..5)),
                }
            }
        })
        .collect();
    DecisionTree::from_nodes(nodes).unwrap()
}

fn bench_concurrent_votes(c: &mut Criterion) {
    let n_cases = 1_000;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let votes: Vec<(usize, String)> = (0..100_000)
        .map(|_| (rng.gen_range(0..n_cases), format!("class{}", rng.gen_range(0..5))))
        .collect();

    c.bench_function("categorical_cast_100k_votes_1k_cases", |b| {
        b.iter(|| {
            let ballots = BallotBox::new(TallyerKind::Categorical, n_cases);
            votes
                .par_iter()
                .for_each(|(case, label)| ballots.cast_vote(*case, label, 1.0));
            ballots
        });
    });
}

fn bench_predict(c: &mut Criterion) {
    let fm = make_matrix(2_000, 20, 42);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let trees = (0..100).map(|_| make_tree(8, 20, &mut rng)).collect();
    let forest = Forest::new(PredictConfig::new(ForestType::Classifier), 0.0, trees);

    c.bench_function("predict_2k_cases_100_trees_depth8", |b| {
        b.iter(|| predict(&fm, &forest).unwrap());
    });
}

criterion_group!(benches, bench_concurrent_votes, bench_predict);
criterion_main!(benches);
