//! End-to-end integration tests: AFM + model -> predictions -> report -> read back.

use std::path::{Path, PathBuf};

use grove_forest::{Forest, ForestType, Predictions, predict};
use grove_io::{FeatureMatrixReader, PredictionWriter, read_tab_separated_predictions};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn regression_round_trip() {
    let fm = FeatureMatrixReader::new(&fixture_path("housing.afm"))
        .read()
        .expect("fixture should parse");
    assert_eq!(fm.n_cases(), 6);
    assert_eq!(fm.n_features(), 3);

    let forest = Forest::load_text(fixture_path("housing.sf")).expect("model should parse");
    assert_eq!(forest.forest_type(), ForestType::Regressor);

    let preds = predict(&fm, &forest).unwrap();
    assert_eq!(
        preds,
        Predictions::Real(vec![160.0, 120.0, 235.0, 145.0, 215.0, 120.0])
    );

    let dir = TempDir::new().unwrap();
    let report_path = dir.path().join("housing.tsv");
    PredictionWriter::new(&report_path)
        .write(&fm, &preds, forest.target())
        .unwrap();

    let text = std::fs::read_to_string(&report_path).unwrap();
    assert_eq!(text.lines().next(), Some("h1\t160\t100"));
    assert_eq!(text.lines().last(), Some("h6\t120\tNA"));

    let report = read_tab_separated_predictions(&report_path).unwrap();
    assert_eq!(report.case_labels, fm.case_labels());
    let Predictions::Real(values) = &preds else {
        unreachable!()
    };
    assert_eq!(&report.predictions, values);
    assert_eq!(report.actual[..5], [100.0, 120.0, 260.0, 150.0, 300.0]);
    assert!(report.actual[5].is_nan());
}

#[test]
fn binary_model_predicts_like_text_model() {
    let fm = FeatureMatrixReader::new(&fixture_path("housing.afm"))
        .read()
        .unwrap();
    let forest = Forest::load_text(fixture_path("housing.sf")).unwrap();

    let dir = TempDir::new().unwrap();
    let bin_path = dir.path().join("housing.bin");
    forest.save(&bin_path).unwrap();
    let reloaded = Forest::load(&bin_path).unwrap();

    assert_eq!(predict(&fm, &reloaded).unwrap(), predict(&fm, &forest).unwrap());
}

#[test]
fn matrix_without_splitter_is_rejected() {
    let dir = TempDir::new().unwrap();
    let afm = dir.path().join("partial.afm");
    std::fs::write(&afm, "id\ta\tb\nN:rooms\t1\t2\n").unwrap();

    let fm = FeatureMatrixReader::new(&afm).read().unwrap();
    let forest = Forest::load_text(fixture_path("housing.sf")).unwrap();
    let err = predict(&fm, &forest).unwrap_err();
    assert!(err.to_string().contains("C:zone"), "{err}");
}
