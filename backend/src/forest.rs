//! Random forest regressor loaded from a self-describing JSON artifact.
//!
//! Layout:
//!
//! ```json
//! {
//!   "name": "random_forest",
//!   "columns": [{"kind": "numeric", "name": "Square Footage"}, ...],
//!   "trees": [{"nodes": [{"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
//!                        {"value": 3120.0}, {"value": 3890.0}]}]
//! }
//! ```
//!
//! `feature` indexes the one-hot encoded vector, not the column list. Nodes are
//! stored in pre-order so a child always sits after its parent; the loader
//! rejects anything else.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::encoding::{ColumnSpec, FeatureEncoder};
use crate::error::{InferenceError, ModelError};
use crate::inference::{FeatureRow, ModelInfo, Predictor};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn validate(&self, index: usize, width: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {index} has no nodes")));
        }
        for (at, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= width {
                        return Err(ModelError::Invalid(format!(
                            "tree {index} node {at} splits on feature {feature}, encoded width is {width}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ModelError::Invalid(format!(
                            "tree {index} node {at} has a non-finite threshold"
                        )));
                    }
                    for child in [left, right] {
                        if child <= at || child >= self.nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "tree {index} node {at} points at invalid child {child}"
                            )));
                        }
                    }
                }
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(ModelError::Invalid(format!(
                        "tree {index} leaf {at} is not finite"
                    )));
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    /// Walk from the root, going left when `x[feature] <= threshold`.
    fn evaluate(&self, x: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForestArtifact {
    #[serde(default)]
    name: Option<String>,
    columns: FeatureEncoder,
    trees: Vec<Tree>,
}

/// Mean of the leaf values reached in every tree.
#[derive(Debug, Clone)]
pub struct RandomForest {
    name: String,
    source: String,
    encoder: FeatureEncoder,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: source.clone(),
            source: e,
        })?;
        Self::parse(&raw, source)
    }

    fn parse(json: &str, source: String) -> Result<Self, ModelError> {
        let artifact: ForestArtifact =
            serde_json::from_str(json).map_err(|e| ModelError::Parse {
                origin: source.clone(),
                source: e,
            })?;

        if artifact.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }
        let width = artifact.columns.width();
        for (index, tree) in artifact.trees.iter().enumerate() {
            tree.validate(index, width)?;
        }

        debug!(
            "Loaded forest from {}: {} trees, {} encoded features",
            source,
            artifact.trees.len(),
            width
        );

        Ok(Self {
            name: artifact.name.unwrap_or_else(|| "random_forest".to_string()),
            source,
            encoder: artifact.columns,
            trees: artifact.trees,
        })
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}

impl Predictor for RandomForest {
    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let x = self.encoder.encode(row)?;
        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(&x)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    fn columns(&self) -> Vec<ColumnSpec> {
        self.encoder.columns().to_vec()
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            backend: "random_forest",
            source: self.source.clone(),
            columns: self.encoder.columns().to_vec(),
            estimators: Some(self.n_estimators()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{check_schema, FeatureValue};

    fn inline(json: &str) -> Result<RandomForest, ModelError> {
        RandomForest::parse(json, "inline artifact".to_string())
    }

    const TINY: &str = r#"{
        "name": "tiny",
        "columns": [
            {"kind": "categorical", "name": "Day of Week", "categories": ["Weekday", "Weekend"]},
            {"kind": "numeric", "name": "Square Footage"}
        ],
        "trees": [
            {"nodes": [
                {"feature": 2, "threshold": 1000.0, "left": 1, "right": 2},
                {"value": 10.0},
                {"value": 20.0}
            ]},
            {"nodes": [
                {"feature": 1, "threshold": 0.5, "left": 1, "right": 2},
                {"value": 1.0},
                {"value": 5.0}
            ]}
        ]
    }"#;

    fn row(day: &str, sqft: f64) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert("Day of Week", FeatureValue::Category(day.into()));
        row.insert("Square Footage", FeatureValue::Number(sqft));
        row
    }

    #[test]
    fn averages_trees() {
        let forest = inline(TINY).unwrap();
        assert_eq!(forest.describe().name, "tiny");
        assert_eq!(forest.n_estimators(), 2);
        assert_eq!(forest.predict(&row("Weekday", 800.0)).unwrap(), 5.5);
        assert_eq!(forest.predict(&row("Weekend", 1000.0)).unwrap(), 7.5);
        assert_eq!(forest.predict(&row("Weekend", 1000.5)).unwrap(), 12.5);
    }

    #[test]
    fn unseen_category_fails_inference() {
        let forest = inline(TINY).unwrap();
        assert!(matches!(
            forest.predict(&row("Holiday", 800.0)),
            Err(InferenceError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn rejects_backwards_children() {
        let json = r#"{
            "columns": [{"kind": "numeric", "name": "A"}],
            "trees": [{"nodes": [
                {"value": 1.0},
                {"feature": 0, "threshold": 1.0, "left": 0, "right": 0}
            ]}]
        }"#;
        assert!(matches!(
            inline(json),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_feature_outside_encoded_width() {
        let json = r#"{
            "columns": [{"kind": "numeric", "name": "A"}],
            "trees": [{"nodes": [
                {"feature": 1, "threshold": 1.0, "left": 1, "right": 2},
                {"value": 1.0},
                {"value": 2.0}
            ]}]
        }"#;
        assert!(matches!(
            inline(json),
            Err(ModelError::Invalid(msg)) if msg.contains("encoded width")
        ));
    }

    #[test]
    fn rejects_empty_forest_and_bad_json() {
        let empty = r#"{"columns": [{"kind": "numeric", "name": "A"}], "trees": []}"#;
        assert!(inline(empty).is_err());
        assert!(matches!(
            inline("{not json"),
            Err(ModelError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RandomForest::from_path("does/not/exist.json").unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn bundled_artifact_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/models/best_energy_model.json");
        let forest = RandomForest::from_path(path).unwrap();
        assert_eq!(forest.n_estimators(), 4);
        assert_eq!(forest.columns().len(), 6);
        assert!(check_schema(&forest.columns()).is_ok());
    }
}
