//! Column schema shared by the model backends.
//!
//! Artifacts describe their input columns in training order. Numeric columns
//! occupy one slot of the dense vector, categorical columns are one-hot encoded
//! over their vocabulary.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, ModelError};
use crate::inference::{FeatureRow, FeatureValue};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpec {
    Numeric { name: String },
    Categorical { name: String, categories: Vec<String> },
}

impl ColumnSpec {
    pub fn name(&self) -> &str {
        match self {
            ColumnSpec::Numeric { name } | ColumnSpec::Categorical { name, .. } => name,
        }
    }

    /// Number of slots this column takes in the encoded vector.
    pub fn width(&self) -> usize {
        match self {
            ColumnSpec::Numeric { .. } => 1,
            ColumnSpec::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// Ordered column specs, validated on construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(try_from = "Vec<ColumnSpec>", into = "Vec<ColumnSpec>")]
pub struct FeatureEncoder {
    columns: Vec<ColumnSpec>,
}

impl FeatureEncoder {
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self, ModelError> {
        if columns.is_empty() {
            return Err(ModelError::Invalid("artifact declares no columns".into()));
        }

        let mut names = HashSet::new();
        for column in &columns {
            if !names.insert(column.name()) {
                return Err(ModelError::Invalid(format!(
                    "column {:?} declared twice",
                    column.name()
                )));
            }
            if let ColumnSpec::Categorical { name, categories } = column {
                if categories.is_empty() {
                    return Err(ModelError::Invalid(format!(
                        "categorical column {name:?} has no categories"
                    )));
                }
                let unique: HashSet<_> = categories.iter().collect();
                if unique.len() != categories.len() {
                    return Err(ModelError::Invalid(format!(
                        "categorical column {name:?} repeats a category"
                    )));
                }
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.iter().map(ColumnSpec::width).sum()
    }

    /// Dense vector in column order. Unseen categories are an error, never a zero row.
    pub fn encode(&self, row: &FeatureRow) -> Result<Vec<f64>, InferenceError> {
        let mut out = Vec::with_capacity(self.width());
        for column in &self.columns {
            let value = row
                .get(column.name())
                .ok_or_else(|| InferenceError::MissingColumn(column.name().to_string()))?;

            match (column, value) {
                (ColumnSpec::Numeric { .. }, FeatureValue::Number(v)) => out.push(*v),
                (ColumnSpec::Categorical { name, categories }, FeatureValue::Category(v)) => {
                    let hot = categories.iter().position(|c| c == v).ok_or_else(|| {
                        InferenceError::UnknownCategory {
                            column: name.clone(),
                            value: v.clone(),
                        }
                    })?;
                    out.extend((0..categories.len()).map(|i| if i == hot { 1.0 } else { 0.0 }));
                }
                (ColumnSpec::Numeric { name }, _) => {
                    return Err(InferenceError::ColumnType {
                        column: name.clone(),
                        expected: "numeric",
                    })
                }
                (ColumnSpec::Categorical { name, .. }, _) => {
                    return Err(InferenceError::ColumnType {
                        column: name.clone(),
                        expected: "categorical",
                    })
                }
            }
        }
        Ok(out)
    }
}

impl TryFrom<Vec<ColumnSpec>> for FeatureEncoder {
    type Error = ModelError;

    fn try_from(columns: Vec<ColumnSpec>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureEncoder> for Vec<ColumnSpec> {
    fn from(encoder: FeatureEncoder) -> Self {
        encoder.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> FeatureEncoder {
        serde_json::from_str(
            r#"[
                {"kind": "categorical", "name": "Building Type", "categories": ["Commercial", "Industrial", "Residential"]},
                {"kind": "numeric", "name": "Square Footage"},
                {"kind": "categorical", "name": "Day of Week", "categories": ["Weekday", "Weekend"]}
            ]"#,
        )
        .unwrap()
    }

    fn row(building: &str, sqft: f64, day: &str) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert("Building Type", FeatureValue::Category(building.into()));
        row.insert("Square Footage", FeatureValue::Number(sqft));
        row.insert("Day of Week", FeatureValue::Category(day.into()));
        row
    }

    #[test]
    fn one_hot_in_vocabulary_order() {
        let enc = encoder();
        assert_eq!(enc.width(), 6);
        assert_eq!(
            enc.encode(&row("Industrial", 1200.0, "Weekend")).unwrap(),
            vec![0.0, 1.0, 0.0, 1200.0, 0.0, 1.0]
        );
    }

    #[test]
    fn unseen_category_is_explicit() {
        let err = encoder().encode(&row("Castle", 1200.0, "Weekday")).unwrap_err();
        match err {
            InferenceError::UnknownCategory { column, value } => {
                assert_eq!(column, "Building Type");
                assert_eq!(value, "Castle");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_value_kind_is_rejected() {
        let mut bad = row("Industrial", 1200.0, "Weekday");
        bad.insert("Square Footage", FeatureValue::Category("large".into()));
        assert!(matches!(
            encoder().encode(&bad),
            Err(InferenceError::ColumnType { expected: "numeric", .. })
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let mut partial = FeatureRow::new();
        partial.insert("Building Type", FeatureValue::Category("Industrial".into()));
        assert!(matches!(
            encoder().encode(&partial),
            Err(InferenceError::MissingColumn(c)) if c == "Square Footage"
        ));
    }

    #[test]
    fn rejects_degenerate_schemas() {
        assert!(FeatureEncoder::new(Vec::new()).is_err());
        assert!(serde_json::from_str::<FeatureEncoder>(
            r#"[{"kind": "categorical", "name": "Day of Week", "categories": []}]"#
        )
        .is_err());
        assert!(serde_json::from_str::<FeatureEncoder>(
            r#"[{"kind": "numeric", "name": "A"}, {"kind": "numeric", "name": "A"}]"#
        )
        .is_err());
    }
}
