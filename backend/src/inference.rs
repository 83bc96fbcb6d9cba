use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::encoding::ColumnSpec;
use crate::error::{InferenceError, ModelError, SchemaError};
use crate::forest::RandomForest;
use crate::models::PredictionRequest;
use crate::onnx::OnnxPredictor;

/// The six semantic request fields, in payload order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Feature {
    BuildingType,
    SquareFootage,
    NumberOfOccupants,
    AppliancesUsed,
    AverageTemperature,
    DayOfWeek,
}

/// How a column is fed to the model.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Numeric => "numeric",
            FeatureKind::Categorical => "categorical",
        }
    }

    fn of(spec: &ColumnSpec) -> Self {
        match spec {
            ColumnSpec::Numeric { .. } => FeatureKind::Numeric,
            ColumnSpec::Categorical { .. } => FeatureKind::Categorical,
        }
    }
}

/// Links a request field to its JSON key and the column name the model was trained with.
#[derive(Copy, Clone, Debug)]
pub struct ColumnMapping {
    pub feature: Feature,
    pub json_name: &'static str,
    pub column: &'static str,
    pub kind: FeatureKind,
}

/// Request key → training column lookup. Column spelling (spaces included)
/// must match the artifact exactly.
pub const FEATURE_COLUMNS: [ColumnMapping; 6] = [
    ColumnMapping {
        feature: Feature::BuildingType,
        json_name: "Building_Type",
        column: "Building Type",
        kind: FeatureKind::Categorical,
    },
    ColumnMapping {
        feature: Feature::SquareFootage,
        json_name: "Square_Footage",
        column: "Square Footage",
        kind: FeatureKind::Numeric,
    },
    ColumnMapping {
        feature: Feature::NumberOfOccupants,
        json_name: "Number_of_Occupants",
        column: "Number of Occupants",
        kind: FeatureKind::Numeric,
    },
    ColumnMapping {
        feature: Feature::AppliancesUsed,
        json_name: "Appliances_Used",
        column: "Appliances Used",
        kind: FeatureKind::Numeric,
    },
    ColumnMapping {
        feature: Feature::AverageTemperature,
        json_name: "Average_Temperature",
        column: "Average Temperature",
        kind: FeatureKind::Numeric,
    },
    ColumnMapping {
        feature: Feature::DayOfWeek,
        json_name: "Day_of_Week",
        column: "Day of Week",
        kind: FeatureKind::Categorical,
    },
];

impl Feature {
    fn mapping(self) -> &'static ColumnMapping {
        &FEATURE_COLUMNS[self as usize]
    }

    pub fn json_name(self) -> &'static str {
        self.mapping().json_name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

/// Single row of named feature values. Lookup is by column name only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureRow {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: FeatureValue) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values.get(column)
    }
}

/// Description of a loaded artifact.
#[derive(Clone, Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub backend: &'static str,
    pub source: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimators: Option<usize>,
}

/// Opaque regression model: one named row in, one kWh estimate out.
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError>;

    /// Columns the model expects to find in a row.
    fn columns(&self) -> Vec<ColumnSpec>;

    fn describe(&self) -> ModelInfo;
}

/// Load the artifact at `path`, picking the backend from the file extension.
pub fn load_predictor(path: &Path) -> Result<Arc<dyn Predictor>, ModelError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Arc::new(RandomForest::from_path(path)?)),
        Some("onnx") => Ok(Arc::new(OnnxPredictor::load(path)?)),
        _ => Err(ModelError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Compare artifact columns with the mapping table, by name and by kind.
pub fn check_schema(columns: &[ColumnSpec]) -> Result<(), SchemaError> {
    let mut missing = Vec::new();
    let mut wrong_kind = Vec::new();
    for mapping in FEATURE_COLUMNS.iter() {
        match columns.iter().find(|c| c.name() == mapping.column) {
            None => missing.push(mapping.column.to_string()),
            Some(spec) if FeatureKind::of(spec) != mapping.kind => wrong_kind.push(format!(
                "{} (expected {}, artifact has {})",
                mapping.column,
                mapping.kind.as_str(),
                FeatureKind::of(spec).as_str()
            )),
            Some(_) => {}
        }
    }
    let unexpected: Vec<String> = columns
        .iter()
        .filter(|c| !FEATURE_COLUMNS.iter().any(|m| m.column == c.name()))
        .map(|c| c.name().to_string())
        .collect();

    if missing.is_empty() && unexpected.is_empty() && wrong_kind.is_empty() {
        Ok(())
    } else {
        Err(SchemaError {
            missing,
            unexpected,
            wrong_kind,
        })
    }
}

/// Round to 2 decimal places on the exact binary value, ties to even.
pub fn round_kwh(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Turns a validated request into a rounded kWh prediction.
#[derive(Clone)]
pub struct InferenceAdapter {
    predictor: Arc<dyn Predictor>,
}

impl InferenceAdapter {
    /// Fails when the predictor's columns do not line up with [`FEATURE_COLUMNS`].
    pub fn new(predictor: Arc<dyn Predictor>) -> Result<Self, SchemaError> {
        check_schema(&predictor.columns())?;
        Ok(Self { predictor })
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<f64, InferenceError> {
        let row = request.to_feature_row();
        let raw = self.predictor.predict(&row)?;
        if !raw.is_finite() {
            return Err(InferenceError::NonFinite(raw));
        }
        Ok(round_kwh(raw))
    }

    pub fn model_info(&self) -> ModelInfo {
        self.predictor.describe()
    }
}
