use std::path::PathBuf;

use crate::ballot::TallyerKind;

/// Errors from forest loading, saving, and prediction.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when reading from or writing to a model stream fails.
    #[error("model stream I/O failed")]
    Stream {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Returned when a model stream contains no forest header.
    #[error("model stream is empty")]
    EmptyStream,

    /// Returned when a record does not have the expected `KEY=VALUE` shape.
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord {
        /// One-based line number of the offending record.
        line: usize,
        /// Human-readable description of what is wrong.
        reason: String,
    },

    /// Returned when a required field is absent from a record.
    #[error("record on line {line} is missing field {field}")]
    MissingField {
        /// One-based line number of the offending record.
        line: usize,
        /// Name of the absent field.
        field: &'static str,
    },

    /// Returned when a numeric or boolean field cannot be parsed.
    #[error("invalid value for {field} on line {line}: \"{raw}\"")]
    InvalidValue {
        /// One-based line number of the offending record.
        line: usize,
        /// Name of the field that failed to parse.
        field: &'static str,
        /// The raw text that failed to parse.
        raw: String,
    },

    /// Returned when the forest header names a type outside the known set.
    #[error("unknown forest type \"{found}\" (expected Classifier or Regressor)")]
    UnknownForestType {
        /// The unrecognized type tag.
        found: String,
    },

    /// Returned when the text format version is not supported by this build.
    #[error("unsupported model format version {found}, expected {expected}")]
    UnsupportedVersion {
        /// The format version this build reads.
        expected: u32,
        /// The format version found in the stream.
        found: u32,
    },

    /// Returned when the stream ends before every declared tree was read.
    #[error("model stream truncated: header declares {expected} trees, found {found}")]
    Truncated {
        /// Tree count declared by the header.
        expected: usize,
        /// Trees actually present.
        found: usize,
    },

    /// Returned when a tree's node records do not form a valid tree.
    #[error("invalid tree {tree}: {reason}")]
    InvalidTree {
        /// Zero-based index of the offending tree.
        tree: usize,
        /// Human-readable description of what is wrong.
        reason: String,
    },

    /// Returned when a tree splits on a feature the matrix does not contain.
    #[error("feature {name} used by the forest is not present in the feature matrix")]
    MissingFeature {
        /// Name of the absent feature.
        name: String,
    },

    /// Returned when a split rule does not fit the kind of its splitter column.
    #[error("feature {name} must be {expected} to be used as this splitter")]
    SplitterKindMismatch {
        /// Name of the splitter feature.
        name: String,
        /// Kind the split rule needs: "numeric" or "categorical".
        expected: &'static str,
    },

    /// Returned when a ballot box is scored against a feature of the wrong kind.
    #[error("cannot score a {tallyer} ballot box against {feature} feature {name}")]
    FeatureKindMismatch {
        /// Kind of the ballot box.
        tallyer: TallyerKind,
        /// Kind of the feature: "numeric" or "categorical".
        feature: &'static str,
        /// Name of the feature.
        name: String,
    },

    /// Returned when a feature has a different number of cases than the matrix.
    #[error("feature {name} has {got} cases, expected {expected}")]
    FeatureLengthMismatch {
        /// Name of the offending feature.
        name: String,
        /// Case count of the matrix.
        expected: usize,
        /// Case count of the feature.
        got: usize,
    },

    /// Returned when two features in a matrix share a name.
    #[error("duplicate feature name {name}")]
    DuplicateFeature {
        /// The duplicated name.
        name: String,
    },

    /// Returned when probabilities are requested from a non-classifier forest.
    #[error("probability output requires a classifier forest")]
    NotAClassifier,

    /// Returned when probabilities are requested but no positive class is configured.
    #[error("probability output requires a positive class label")]
    MissingPositiveClass,

    /// Returned when binary model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when binary model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a binary model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
