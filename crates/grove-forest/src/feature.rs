//! Column-oriented feature matrix with missing values.

use std::collections::HashMap;

use crate::catmap::CategoryMap;
use crate::error::ForestError;

/// Text written in place of a missing or unknown value.
pub const MISSING_LABEL: &str = "NA";

/// A real-valued feature column.
#[derive(Debug, Clone)]
pub struct NumericFeature {
    name: String,
    values: Vec<Option<f64>>,
}

impl NumericFeature {
    /// Create a numeric feature; `None` marks a missing value.
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Return the feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if the feature has no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return the value for `case`, or `None` if missing.
    #[must_use]
    pub fn get(&self, case: usize) -> Option<f64> {
        self.values[case]
    }
}

/// A categorical feature column backed by its own [`CategoryMap`].
#[derive(Debug, Clone)]
pub struct CategoricalFeature {
    name: String,
    codes: Vec<Option<usize>>,
    map: CategoryMap,
}

impl CategoricalFeature {
    /// Create a categorical feature from raw labels; `None` marks a missing value.
    pub fn from_labels<S: AsRef<str>>(name: impl Into<String>, labels: &[Option<S>]) -> Self {
        let map = CategoryMap::new();
        let codes = labels
            .iter()
            .map(|label| label.as_ref().map(|l| map.code_of(l.as_ref())))
            .collect();
        Self {
            name: name.into(),
            codes,
            map,
        }
    }

    /// Return the feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Return `true` if the feature has no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Return the category code for `case`, or `None` if missing.
    #[must_use]
    pub fn get(&self, case: usize) -> Option<usize> {
        self.codes[case]
    }

    /// Return the label for `case`, or `None` if missing.
    #[must_use]
    pub fn label(&self, case: usize) -> Option<String> {
        self.codes[case].map(|code| self.map.label_of(code))
    }

    /// Return the map between this feature's labels and codes.
    #[must_use]
    pub fn category_map(&self) -> &CategoryMap {
        &self.map
    }

    /// Return the number of distinct categories.
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.map.n_categories()
    }
}

/// One feature column of a [`FeatureMatrix`].
#[derive(Debug, Clone)]
pub enum Feature {
    /// Real-valued column.
    Numeric(NumericFeature),
    /// Label-valued column.
    Categorical(CategoricalFeature),
}

impl Feature {
    /// Return the feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Feature::Numeric(f) => f.name(),
            Feature::Categorical(f) => f.name(),
        }
    }

    /// Return the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Feature::Numeric(f) => f.len(),
            Feature::Categorical(f) => f.len(),
        }
    }

    /// Return `true` if the feature has no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` if the value for `case` is missing.
    #[must_use]
    pub fn is_missing(&self, case: usize) -> bool {
        match self {
            Feature::Numeric(f) => f.get(case).is_none(),
            Feature::Categorical(f) => f.get(case).is_none(),
        }
    }

    /// Render the value for `case` as text, `"NA"` when missing.
    #[must_use]
    pub fn get_str(&self, case: usize) -> String {
        match self {
            Feature::Numeric(f) => f
                .get(case)
                .map_or_else(|| MISSING_LABEL.to_string(), |v| v.to_string()),
            Feature::Categorical(f) => f
                .label(case)
                .unwrap_or_else(|| MISSING_LABEL.to_string()),
        }
    }

    /// Return a short description of the feature kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Feature::Numeric(_) => "numeric",
            Feature::Categorical(_) => "categorical",
        }
    }
}

/// A set of equally long feature columns plus one label per case.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    case_labels: Vec<String>,
    features: Vec<Feature>,
    index: HashMap<String, usize>,
}

impl FeatureMatrix {
    /// Assemble a matrix from case labels and feature columns.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::FeatureLengthMismatch`] | a feature's length differs from `case_labels.len()` |
    /// | [`ForestError::DuplicateFeature`] | two features share a name |
    pub fn new(case_labels: Vec<String>, features: Vec<Feature>) -> Result<Self, ForestError> {
        let mut index = HashMap::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            if feature.len() != case_labels.len() {
                return Err(ForestError::FeatureLengthMismatch {
                    name: feature.name().to_string(),
                    expected: case_labels.len(),
                    got: feature.len(),
                });
            }
            if index.insert(feature.name().to_string(), i).is_some() {
                return Err(ForestError::DuplicateFeature {
                    name: feature.name().to_string(),
                });
            }
        }
        Ok(Self {
            case_labels,
            features,
            index,
        })
    }

    /// Return the number of cases.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.case_labels.len()
    }

    /// Return the number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Return the case labels in order.
    #[must_use]
    pub fn case_labels(&self) -> &[String] {
        &self.case_labels
    }

    /// Return all feature columns in order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Look up a feature by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).map(|&i| &self.features[i])
    }

    /// Return the column index of a feature by name.
    #[must_use]
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_matrix() -> FeatureMatrix {
        FeatureMatrix::new(
            vec!["c0".into(), "c1".into(), "c2".into()],
            vec![
                Feature::Numeric(NumericFeature::new("N:x", vec![Some(1.5), None, Some(-2.0)])),
                Feature::Categorical(CategoricalFeature::from_labels(
                    "C:color",
                    &[Some("red"), Some("blue"), None],
                )),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_by_name() {
        let fm = small_matrix();
        assert_eq!(fm.n_cases(), 3);
        assert_eq!(fm.n_features(), 2);
        assert_eq!(fm.feature_index("C:color"), Some(1));
        assert!(fm.feature("N:missing").is_none());
    }

    #[test]
    fn missing_values_render_as_na() {
        let fm = small_matrix();
        let x = fm.feature("N:x").unwrap();
        assert!(x.is_missing(1));
        assert_eq!(x.get_str(0), "1.5");
        assert_eq!(x.get_str(1), "NA");

        let color = fm.feature("C:color").unwrap();
        assert_eq!(color.get_str(1), "blue");
        assert_eq!(color.get_str(2), "NA");
    }

    #[test]
    fn categorical_codes_follow_first_seen_order() {
        let f = CategoricalFeature::from_labels("C:y", &[Some("b"), Some("a"), Some("b")]);
        assert_eq!(f.get(0), Some(0));
        assert_eq!(f.get(1), Some(1));
        assert_eq!(f.get(2), Some(0));
        assert_eq!(f.n_categories(), 2);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = FeatureMatrix::new(
            vec!["a".into(), "b".into()],
            vec![Feature::Numeric(NumericFeature::new("N:x", vec![Some(1.0)]))],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureLengthMismatch { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = FeatureMatrix::new(
            vec!["a".into()],
            vec![
                Feature::Numeric(NumericFeature::new("N:x", vec![Some(1.0)])),
                Feature::Numeric(NumericFeature::new("N:x", vec![Some(2.0)])),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ForestError::DuplicateFeature { .. }));
    }
}
