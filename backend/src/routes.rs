use actix_cors::Cors;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse, Resource, Responder};
use log::{error, info, warn};
use serde_json::{json, Value};

use crate::docs;
use crate::error::{ApiError, FieldErrorKind, ValidationError};
use crate::inference::{InferenceAdapter, FEATURE_COLUMNS};
use crate::models::{Liveness, PredictionRequest, PredictionResponse, MODEL_LABEL};

const JSON_LIMIT: usize = 64 * 1024;

pub async fn home() -> impl Responder {
    HttpResponse::Ok().json(Liveness::live())
}

pub async fn predict(
    adapter: web::Data<InferenceAdapter>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let request = PredictionRequest::from_json(&payload).map_err(|e| {
        warn!("Rejected prediction request: {:?}", e.fields());
        e
    })?;

    let adapter = adapter.into_inner();
    let kwh = web::block(move || adapter.predict(&request))
        .await
        .map_err(|e| {
            error!("Blocking pool error: {}", e);
            ApiError::Blocking(e.to_string())
        })?
        .map_err(|e| {
            error!("Inference failed: {}", e);
            e
        })?;

    info!("Prediction served: {:.2} kWh", kwh);
    Ok(HttpResponse::Ok().json(PredictionResponse::success(kwh)))
}

pub async fn model_info(adapter: web::Data<InferenceAdapter>) -> impl Responder {
    let features: Vec<Value> = FEATURE_COLUMNS
        .iter()
        .map(|m| json!({"field": m.json_name, "column": m.column}))
        .collect();

    HttpResponse::Ok().json(json!({
        "model": MODEL_LABEL,
        "artifact": adapter.model_info(),
        "features": features
    }))
}

pub async fn openapi() -> impl Responder {
    HttpResponse::Ok().json(docs::openapi_document())
}

pub async fn swagger() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(docs::swagger_page())
}

pub async fn redoc() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(docs::redoc_page())
}

pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({"detail": "Not Found"}))
}

pub async fn method_not_allowed() -> impl Responder {
    HttpResponse::MethodNotAllowed().json(json!({"detail": "Method Not Allowed"}))
}

/// Malformed bodies become 422s like field failures; oversized ones keep actix's 413.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    if matches!(
        err,
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. }
    ) {
        warn!("Rejected oversized body: {}", err);
        return err.into();
    }

    warn!("Rejected unreadable body: {}", err);
    let kind = match &err {
        JsonPayloadError::ContentType => FieldErrorKind::ModelType,
        _ => FieldErrorKind::JsonInvalid,
    };
    ApiError::from(ValidationError::body(kind, err.to_string())).into()
}

/// A body sent without `Content-Type` is still parsed as JSON.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .content_type_required(false)
        .error_handler(json_error)
}

/// Any origin, method and header; credentials allowed (origin is echoed back).
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

// Known path, wrong method: JSON 405 instead of an empty body.
fn resource(path: &str) -> Resource {
    web::resource(path).default_service(web::route().to(method_not_allowed))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(resource("/").route(web::get().to(home)))
        .service(resource("/predict").route(web::post().to(predict)))
        .service(resource("/model-info").route(web::get().to(model_info)))
        .service(resource("/openapi.json").route(web::get().to(openapi)))
        .service(resource("/docs").route(web::get().to(swagger)))
        .service(resource("/redoc").route(web::get().to(redoc)));
}
