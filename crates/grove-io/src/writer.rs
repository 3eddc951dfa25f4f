//! Tab-separated prediction reports: `case_label`, prediction, actual value.

use std::path::{Path, PathBuf};

use grove_forest::{FeatureMatrix, MISSING_LABEL, Predictions};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Writes one `label \t prediction \t actual` line per case.
pub struct PredictionWriter {
    path: PathBuf,
}

impl PredictionWriter {
    /// Create a new writer targeting the given report path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Write `predictions` for every case of `fm`.
    ///
    /// The actual column holds the value of feature `target`, or `NA` when
    /// the matrix has no such feature or the value is missing.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be created or written.
    ///
    /// # Panics
    ///
    /// Panics if `predictions` has fewer entries than `fm` has cases.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write(
        &self,
        fm: &FeatureMatrix,
        predictions: &Predictions,
        target: &str,
    ) -> Result<(), IoError> {
        let file = std::fs::File::create(&self.path).map_err(|e| self.write_error(e))?;
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(file);

        let actual = fm.feature(target);
        if actual.is_none() {
            debug!(feature = target, "target absent from matrix; actual column is NA");
        }

        for (case, label) in fm.case_labels().iter().enumerate() {
            let truth = actual.map_or_else(|| MISSING_LABEL.to_string(), |f| f.get_str(case));
            wtr.write_record([label.as_str(), predictions.get_str(case).as_str(), truth.as_str()])
                .map_err(|e| self.write_error(e.into()))?;
        }
        wtr.flush().map_err(|e| self.write_error(e))?;

        info!(n_cases = fm.n_cases(), "predictions written");
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> IoError {
        IoError::WriteFile {
            path: self.path.clone(),
            source,
        }
    }
}

/// Real-valued prediction report read back from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionReport {
    /// Case label from the first column.
    pub case_labels: Vec<String>,
    /// Prediction column; `NaN` where a cell does not parse.
    pub predictions: Vec<f64>,
    /// Actual column; `NaN` where a cell does not parse.
    pub actual: Vec<f64>,
}

/// Read a report written by [`PredictionWriter`], parsing the prediction and
/// actual columns as reals.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record |
#[instrument(fields(path = %path.display()))]
pub fn read_tab_separated_predictions(path: &Path) -> Result<PredictionReport, IoError> {
    let file = std::fs::File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let real = |cell: Option<&str>| cell.and_then(|s| s.parse().ok()).unwrap_or(f64::NAN);

    let mut report = PredictionReport::default();
    for result in rdr.records() {
        let record = result.map_err(|e| IoError::CsvParse {
            path: path.to_path_buf(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        report.case_labels.push(record.get(0).unwrap_or("").to_string());
        report.predictions.push(real(record.get(1)));
        report.actual.push(real(record.get(2)));
    }

    debug!(n_cases = report.case_labels.len(), "prediction report read");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_forest::{CategoricalFeature, Feature, NumericFeature};
    use tempfile::TempDir;

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                Feature::Numeric(NumericFeature::new("N:y", vec![Some(1.5), None, Some(3.0)])),
                Feature::Categorical(CategoricalFeature::from_labels(
                    "C:k",
                    &[Some("x"), Some("y"), None],
                )),
            ],
        )
        .unwrap()
    }

    #[test]
    fn writes_label_prediction_actual() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preds.tsv");
        let preds = Predictions::Real(vec![1.25, 2.0, f64::NAN]);
        PredictionWriter::new(&path).write(&matrix(), &preds, "N:y").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a\t1.25\t1.5\nb\t2\tNA\nc\tNaN\t3\n");
    }

    #[test]
    fn absent_target_writes_na() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preds.tsv");
        let preds = Predictions::Categorical(vec!["x".into(), "NA".into(), "y".into()]);
        PredictionWriter::new(&path).write(&matrix(), &preds, "C:absent").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a\tx\tNA\nb\tNA\tNA\nc\ty\tNA\n");
    }

    #[test]
    fn categorical_target_written_as_label() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preds.tsv");
        let preds = Predictions::Categorical(vec!["x".into(), "x".into(), "x".into()]);
        PredictionWriter::new(&path).write(&matrix(), &preds, "C:k").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a\tx\tx\nb\tx\ty\nc\tx\tNA\n");
    }

    #[test]
    fn read_back_uses_nan_for_unparsable_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preds.tsv");
        std::fs::write(&path, "a\t1.25\t1.5\nb\t2\tNA\nc\tlabel\n").unwrap();

        let report = read_tab_separated_predictions(&path).unwrap();
        assert_eq!(report.case_labels, vec!["a", "b", "c"]);
        assert_eq!(report.predictions[..2], [1.25, 2.0]);
        assert!(report.predictions[2].is_nan());
        assert_eq!(report.actual[0], 1.5);
        assert!(report.actual[1].is_nan());
        assert!(report.actual[2].is_nan());
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_such_dir").join("preds.tsv");
        let preds = Predictions::Real(vec![0.0; 3]);
        let err = PredictionWriter::new(&path).write(&matrix(), &preds, "N:y").unwrap_err();
        assert!(matches!(err, IoError::WriteFile { .. }));
    }
}
