use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Category of a single field failure, rendered as the `type` of a detail entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldErrorKind {
    Missing,
    IntType,
    IntParsing,
    IntFromFloat,
    FloatType,
    FloatParsing,
    StringType,
    GreaterThanEqual,
    LessThanEqual,
    ModelType,
    JsonInvalid,
}

impl FieldErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldErrorKind::Missing => "missing",
            FieldErrorKind::IntType => "int_type",
            FieldErrorKind::IntParsing => "int_parsing",
            FieldErrorKind::IntFromFloat => "int_from_float",
            FieldErrorKind::FloatType => "float_type",
            FieldErrorKind::FloatParsing => "float_parsing",
            FieldErrorKind::StringType => "string_type",
            FieldErrorKind::GreaterThanEqual => "greater_than_equal",
            FieldErrorKind::LessThanEqual => "less_than_equal",
            FieldErrorKind::ModelType => "model_type",
            FieldErrorKind::JsonInvalid => "json_invalid",
        }
    }
}

/// One rejected field. `field` is `None` when the body as a whole is unusable.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: Option<&'static str>,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            kind,
            message: message.into(),
        }
    }

    pub fn body(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: None,
            kind,
            message: message.into(),
        }
    }

    fn detail(&self) -> ErrorDetail<'_> {
        let mut loc = vec!["body"];
        loc.extend(self.field);
        ErrorDetail {
            loc,
            msg: &self.message,
            kind: self.kind.as_str(),
        }
    }
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    loc: Vec<&'a str>,
    msg: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

/// Every field failure found in one request payload.
#[derive(Debug, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn body(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::body(kind, message)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Field names that failed, in payload check order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().filter_map(|e| e.field).collect()
    }
}

/// Failure raised by a predictor on an otherwise valid request.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("unknown category {value:?} for column {column:?}")]
    UnknownCategory { column: String, value: String },
    #[error("feature row has no value for column {0:?}")]
    MissingColumn(String),
    #[error("column {column:?} expects a {expected} value")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
    #[error("model backend failed: {0}")]
    Backend(String),
}

/// Artifact could not be loaded. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("unsupported model artifact {0:?} (expected .json or .onnx)")]
    UnsupportedFormat(String),
    #[error("onnx model {path}: {message}")]
    Onnx { path: String, message: String },
}

/// Artifact columns disagree with the request → column mapping.
#[derive(Debug, Error)]
#[error(
    "model columns do not match the request mapping (missing: {missing:?}, unexpected: {unexpected:?}, wrong kind: {wrong_kind:?})"
)]
pub struct SchemaError {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
    pub wrong_kind: Vec<String>,
}

/// Error surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("inference worker unavailable: {0}")]
    Blocking(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Inference(_) | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(err) => {
                let detail: Vec<_> = err.errors().iter().map(FieldError::detail).collect();
                json!({ "detail": detail })
            }
            other => json!({ "detail": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
