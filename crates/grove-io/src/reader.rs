//! Annotated feature matrix (AFM) reader.

use std::path::{Path, PathBuf};

use grove_forest::{CategoricalFeature, Feature, FeatureMatrix, NumericFeature};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Cell values read as missing.
fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw == "?" || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan")
}

/// Reads a tab-separated annotated feature matrix.
///
/// Expected layout:
/// - Header row: first cell ignored, remaining cells are case labels
/// - One row per feature: name, then one value per case
/// - `N:` names are numeric; `C:` and `B:` names are categorical
/// - `NA`, `na`, `?`, `nan` or an empty cell is a missing value
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record |
/// | [`IoError::EmptyMatrix`] | No case labels in the header |
/// | [`IoError::InconsistentRowLength`] | Row has a different value count than the header |
/// | [`IoError::UnknownFeaturePrefix`] | Feature name has no known type prefix |
/// | [`IoError::InvalidNumber`] | Numeric cell is neither a number nor missing |
/// | [`IoError::Matrix`] | Duplicate feature names |
pub struct FeatureMatrixReader {
    path: PathBuf,
}

impl FeatureMatrixReader {
    /// Create a new reader for the given AFM file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the file, returning a [`FeatureMatrix`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureMatrix, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so short rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let case_labels: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        if case_labels.is_empty() {
            return Err(IoError::EmptyMatrix {
                path: self.path.clone(),
            });
        }
        let n_cases = case_labels.len();
        debug!(n_cases, "read AFM header");

        let mut features = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let name = record.get(0).unwrap_or("").to_string();
            if name.is_empty() && record.len() <= 1 {
                continue;
            }
            if record.len() != n_cases + 1 {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    feature: name,
                    expected: n_cases,
                    got: record.len().saturating_sub(1),
                });
            }
            let cells: Vec<&str> = record.iter().skip(1).collect();
            features.push(self.parse_feature(name, &cells)?);
        }

        let fm = FeatureMatrix::new(case_labels, features).map_err(|e| IoError::Matrix {
            path: self.path.clone(),
            source: e,
        })?;

        info!(n_cases, n_features = fm.n_features(), "feature matrix loaded");
        Ok(fm)
    }

    fn parse_feature(&self, name: String, cells: &[&str]) -> Result<Feature, IoError> {
        if name.starts_with("N:") {
            let mut values = Vec::with_capacity(cells.len());
            for (case, raw) in cells.iter().enumerate() {
                if is_missing(raw) {
                    values.push(None);
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| IoError::InvalidNumber {
                    path: self.path.clone(),
                    feature: name.clone(),
                    case,
                    raw: (*raw).to_string(),
                })?;
                values.push(Some(value));
            }
            Ok(Feature::Numeric(NumericFeature::new(name, values)))
        } else if name.starts_with("C:") || name.starts_with("B:") {
            let labels: Vec<Option<&str>> = cells
                .iter()
                .map(|raw| (!is_missing(raw)).then_some(*raw))
                .collect();
            Ok(Feature::Categorical(CategoricalFeature::from_labels(name, &labels)))
        } else {
            Err(IoError::UnknownFeaturePrefix {
                path: self.path.clone(),
                name,
            })
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_afm(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_mixed_features() {
        let afm = "id\tc1\tc2\tc3\nN:x\t1.5\tNA\t-2\nC:color\tred\t?\tblue\nB:flag\t1\t0\t\n";
        let f = write_afm(afm);
        let fm = FeatureMatrixReader::new(f.path()).read().unwrap();
        assert_eq!(fm.case_labels(), ["c1", "c2", "c3"]);
        assert_eq!(fm.n_features(), 3);

        let Some(Feature::Numeric(x)) = fm.feature("N:x") else {
            panic!("N:x should be numeric");
        };
        assert_eq!(x.get(0), Some(1.5));
        assert_eq!(x.get(1), None);
        assert_eq!(x.get(2), Some(-2.0));

        let color = fm.feature("C:color").unwrap();
        assert_eq!(color.get_str(0), "red");
        assert!(color.is_missing(1));
        assert!(fm.feature("B:flag").unwrap().is_missing(2));
    }

    #[test]
    fn missing_tokens() {
        for token in ["NA", "na", "?", "nan", "NaN", ""] {
            assert!(is_missing(token), "{token:?} should be missing");
        }
        assert!(!is_missing("0"));
    }

    #[test]
    fn error_file_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = FeatureMatrixReader::new(&dir.path().join("absent.afm")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_matrix() {
        let f = write_afm("");
        let result = FeatureMatrixReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyMatrix { .. })));

        let f = write_afm("id\n");
        let result = FeatureMatrixReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyMatrix { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_afm("id\ta\tb\nN:x\t1\t2\nN:y\t1\n");
        let result = FeatureMatrixReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { row_index: 1, expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn error_unknown_prefix() {
        let f = write_afm("id\ta\nX:weird\t1\n");
        let result = FeatureMatrixReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::UnknownFeaturePrefix { name, .. }) if name == "X:weird"));
    }

    #[test]
    fn error_invalid_number() {
        let f = write_afm("id\ta\tb\nN:x\t1\tabc\n");
        let result = FeatureMatrixReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::InvalidNumber { case: 1, .. })));
    }

    #[test]
    fn error_duplicate_feature() {
        let f = write_afm("id\ta\nN:x\t1\nN:x\t2\n");
        let result = FeatureMatrixReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::Matrix { .. })));
    }
}
