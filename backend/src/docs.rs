//! OpenAPI description served at `/openapi.json`, rendered by Swagger UI at
//! `/docs` and by ReDoc at `/redoc`.

use serde_json::{json, Map, Value};

use crate::inference::FEATURE_COLUMNS;
use crate::models::{
    APPLIANCES_RANGE, MODEL_LABEL, OCCUPANTS_RANGE, SQUARE_FOOTAGE_RANGE, TEMPERATURE_RANGE,
};

pub const TITLE: &str = "Building Energy Consumption Predictor";
pub const API_VERSION: &str = "1.0";

fn building_input_schema() -> Value {
    let properties = [
        json!({"type": "string", "example": "Industrial"}),
        json!({"type": "integer", "minimum": SQUARE_FOOTAGE_RANGE.0, "maximum": SQUARE_FOOTAGE_RANGE.1, "example": 40000}),
        json!({"type": "integer", "minimum": OCCUPANTS_RANGE.0, "maximum": OCCUPANTS_RANGE.1, "example": 120}),
        json!({"type": "integer", "minimum": APPLIANCES_RANGE.0, "maximum": APPLIANCES_RANGE.1, "example": 80}),
        json!({"type": "number", "minimum": TEMPERATURE_RANGE.0, "maximum": TEMPERATURE_RANGE.1, "example": 28.0}),
        json!({"type": "string", "example": "Weekday"}),
    ];

    let mut props = Map::new();
    for (mapping, schema) in FEATURE_COLUMNS.iter().zip(properties) {
        props.insert(mapping.json_name.to_string(), schema);
    }
    let required: Vec<&str> = FEATURE_COLUMNS.iter().map(|m| m.json_name).collect();

    json!({
        "title": "BuildingInput",
        "type": "object",
        "properties": props,
        "required": required
    })
}

pub fn openapi_document() -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": TITLE,
            "description": format!("{MODEL_LABEL}, production ready"),
            "version": API_VERSION
        },
        "paths": {
            "/": {
                "get": {
                    "summary": "Home",
                    "responses": {"200": {"description": "Liveness message"}}
                }
            },
            "/predict": {
                "post": {
                    "summary": "Predict",
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/BuildingInput"}}}
                    },
                    "responses": {
                        "200": {
                            "description": "Predicted consumption",
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/PredictionResponse"}}}
                        },
                        "422": {"description": "Validation Error"},
                        "500": {"description": "Inference Error"}
                    }
                }
            },
            "/model-info": {
                "get": {
                    "summary": "Model Info",
                    "responses": {"200": {"description": "Loaded artifact and column mapping"}}
                }
            }
        },
        "components": {
            "schemas": {
                "BuildingInput": building_input_schema(),
                "PredictionResponse": {
                    "type": "object",
                    "properties": {
                        "predicted_energy_kwh": {"type": "number"},
                        "unit": {"type": "string"},
                        "model": {"type": "string"},
                        "status": {"type": "string"}
                    },
                    "required": ["predicted_energy_kwh", "unit", "model", "status"]
                }
            }
        }
    })
}

pub fn swagger_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<link type="text/css" rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
<title>{TITLE} - Swagger UI</title>
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
const ui = SwaggerUIBundle({{ url: '/openapi.json', dom_id: '#swagger-ui' }})
</script>
</body>
</html>"#
    )
}

pub fn redoc_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>{TITLE} - ReDoc</title>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>body {{ margin: 0; padding: 0; }}</style>
</head>
<body>
<redoc spec-url="/openapi.json"></redoc>
<script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>"#
    )
}
