use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, FieldErrorKind, ValidationError};
use crate::inference::{Feature, FeatureRow, FeatureValue, FEATURE_COLUMNS};

pub const LIVENESS_MESSAGE: &str = "Energy API is LIVE! → /docs";
pub const MODEL_LABEL: &str = "Random Forest (R² = 0.9813)";
pub const UNIT: &str = "kWh";

pub const SQUARE_FOOTAGE_RANGE: (i64, i64) = (500, 100_000);
pub const OCCUPANTS_RANGE: (i64, i64) = (1, 1_000);
pub const APPLIANCES_RANGE: (i64, i64) = (1, 300);
pub const TEMPERATURE_RANGE: (f64, f64) = (10.0, 40.0);

/// Validated building description. Only built through [`PredictionRequest::from_json`]
/// outside of tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub building_type: String,
    pub square_footage: i64,
    pub number_of_occupants: i64,
    pub appliances_used: i64,
    pub average_temperature: f64,
    pub day_of_week: String,
}

impl PredictionRequest {
    /// Check presence, type and bounds of every field, collecting all failures.
    pub fn from_json(payload: &Value) -> Result<Self, ValidationError> {
        let Some(object) = payload.as_object() else {
            return Err(ValidationError::body(
                FieldErrorKind::ModelType,
                "Input should be a valid JSON object",
            ));
        };

        let mut errors = Vec::new();
        let building_type = string_field(object, Feature::BuildingType, &mut errors);
        let square_footage =
            int_field(object, Feature::SquareFootage, SQUARE_FOOTAGE_RANGE, &mut errors);
        let number_of_occupants =
            int_field(object, Feature::NumberOfOccupants, OCCUPANTS_RANGE, &mut errors);
        let appliances_used =
            int_field(object, Feature::AppliancesUsed, APPLIANCES_RANGE, &mut errors);
        let average_temperature =
            float_field(object, Feature::AverageTemperature, TEMPERATURE_RANGE, &mut errors);
        let day_of_week = string_field(object, Feature::DayOfWeek, &mut errors);

        match (
            building_type,
            square_footage,
            number_of_occupants,
            appliances_used,
            average_temperature,
            day_of_week,
        ) {
            (Some(bt), Some(sf), Some(no), Some(au), Some(at), Some(dw)) if errors.is_empty() => {
                Ok(Self {
                    building_type: bt,
                    square_footage: sf,
                    number_of_occupants: no,
                    appliances_used: au,
                    average_temperature: at,
                    day_of_week: dw,
                })
            }
            _ => Err(ValidationError::new(errors)),
        }
    }

    pub fn value(&self, feature: Feature) -> FeatureValue {
        match feature {
            Feature::BuildingType => FeatureValue::Category(self.building_type.clone()),
            Feature::SquareFootage => FeatureValue::Number(self.square_footage as f64),
            Feature::NumberOfOccupants => FeatureValue::Number(self.number_of_occupants as f64),
            Feature::AppliancesUsed => FeatureValue::Number(self.appliances_used as f64),
            Feature::AverageTemperature => FeatureValue::Number(self.average_temperature),
            Feature::DayOfWeek => FeatureValue::Category(self.day_of_week.clone()),
        }
    }

    /// Rename every field to its training column.
    pub fn to_feature_row(&self) -> FeatureRow {
        let mut row = FeatureRow::new();
        for mapping in FEATURE_COLUMNS.iter() {
            row.insert(mapping.column, self.value(mapping.feature));
        }
        row
    }
}

fn lookup<'a>(
    object: &'a Map<String, Value>,
    feature: Feature,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Value> {
    let value = object.get(feature.json_name());
    if value.is_none() {
        errors.push(FieldError::new(
            feature.json_name(),
            FieldErrorKind::Missing,
            "Field required",
        ));
    }
    value
}

fn string_field(
    object: &Map<String, Value>,
    feature: Feature,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = lookup(object, feature, errors)?;
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            errors.push(FieldError::new(
                feature.json_name(),
                FieldErrorKind::StringType,
                "Input should be a valid string",
            ));
            None
        }
    }
}

// Floats with no fractional part count as integers.
fn whole(f: f64) -> Result<i64, FieldErrorKind> {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Ok(f as i64)
    } else {
        Err(FieldErrorKind::IntFromFloat)
    }
}

/// Lax integer coercion: JSON integers, whole floats and numeric strings.
fn coerce_int(value: &Value) -> Result<i64, FieldErrorKind> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => Ok(v),
            None => n.as_f64().ok_or(FieldErrorKind::IntType).and_then(whole),
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().or_else(|_| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .ok_or(FieldErrorKind::IntParsing)
                    .and_then(whole)
            })
        }
        _ => Err(FieldErrorKind::IntType),
    }
}

/// Lax float coercion: any JSON number or a finite numeric string.
fn coerce_float(value: &Value) -> Result<f64, FieldErrorKind> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(FieldErrorKind::FloatType),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or(FieldErrorKind::FloatParsing),
        _ => Err(FieldErrorKind::FloatType),
    }
}

fn int_field(
    object: &Map<String, Value>,
    feature: Feature,
    (min, max): (i64, i64),
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    let value = lookup(object, feature, errors)?;
    match coerce_int(value) {
        Ok(v) => check_bounds(feature, v, min, max, errors),
        Err(kind) => {
            let message = match kind {
                FieldErrorKind::IntFromFloat => {
                    "Input should be a valid integer, got a number with a fractional part"
                }
                FieldErrorKind::IntParsing => {
                    "Input should be a valid integer, unable to parse string as an integer"
                }
                _ => "Input should be a valid integer",
            };
            errors.push(FieldError::new(feature.json_name(), kind, message));
            None
        }
    }
}

fn float_field(
    object: &Map<String, Value>,
    feature: Feature,
    (min, max): (f64, f64),
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let value = lookup(object, feature, errors)?;
    match coerce_float(value) {
        Ok(v) => check_bounds(feature, v, min, max, errors),
        Err(kind) => {
            let message = match kind {
                FieldErrorKind::FloatParsing => {
                    "Input should be a valid number, unable to parse string as a number"
                }
                _ => "Input should be a valid number",
            };
            errors.push(FieldError::new(feature.json_name(), kind, message));
            None
        }
    }
}

fn check_bounds<T>(
    feature: Feature,
    v: T,
    min: T,
    max: T,
    errors: &mut Vec<FieldError>,
) -> Option<T>
where
    T: PartialOrd + std::fmt::Display,
{
    if v < min {
        errors.push(FieldError::new(
            feature.json_name(),
            FieldErrorKind::GreaterThanEqual,
            format!("Input should be greater than or equal to {min}"),
        ));
        None
    } else if v > max {
        errors.push(FieldError::new(
            feature.json_name(),
            FieldErrorKind::LessThanEqual,
            format!("Input should be less than or equal to {max}"),
        ));
        None
    } else {
        Some(v)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub predicted_energy_kwh: f64,
    pub unit: String,
    pub model: String,
    pub status: String,
}

impl PredictionResponse {
    pub fn success(predicted_energy_kwh: f64) -> Self {
        PredictionResponse {
            predicted_energy_kwh,
            unit: UNIT.to_string(),
            model: MODEL_LABEL.to_string(),
            status: "success".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Liveness {
    pub message: String,
}

impl Liveness {
    pub fn live() -> Self {
        Liveness {
            message: LIVENESS_MESSAGE.to_string(),
        }
    }
}
