//! ONNX regressor executed with tract.
//!
//! The graph consumes the one-hot encoded row as `f32 [1, width]`. Since the
//! graph itself carries no column names, the schema lives next to the model
//! as `<stem>.schema.json` (same column format as the forest artifact).

use std::fs;
use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;

use crate::encoding::{ColumnSpec, FeatureEncoder};
use crate::error::{InferenceError, ModelError};
use crate::inference::{FeatureRow, ModelInfo, Predictor};

type Plan = TypedRunnableModel<TypedModel>;

pub struct OnnxPredictor {
    name: String,
    model: Plan,
    encoder: FeatureEncoder,
    source: String,
}

pub fn schema_path_for(model_path: &Path) -> PathBuf {
    model_path.with_extension("schema.json")
}

impl OnnxPredictor {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, ModelError> {
        let model_path = model_path.as_ref();
        let source = model_path.display().to_string();

        let schema_path = schema_path_for(model_path);
        let schema_origin = schema_path.display().to_string();
        let raw = fs::read_to_string(&schema_path).map_err(|e| ModelError::Io {
            path: schema_origin.clone(),
            source: e,
        })?;
        let encoder: FeatureEncoder =
            serde_json::from_str(&raw).map_err(|e| ModelError::Parse {
                origin: schema_origin,
                source: e,
            })?;

        let model = build_plan(model_path, encoder.width()).map_err(|e| ModelError::Onnx {
            path: source.clone(),
            message: format!("{e:#}"),
        })?;

        let name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx_model")
            .to_string();

        Ok(Self {
            name,
            model,
            encoder,
            source,
        })
    }

    fn run(&self, features: &[f32]) -> TractResult<Option<f64>> {
        let input = Tensor::from_shape(&[1, features.len()], features)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let Some(first) = outputs.first() else {
            return Ok(None);
        };
        let as_f64 = first.cast_to::<f64>()?;
        let value = as_f64.to_array_view::<f64>()?.iter().next().copied();
        Ok(value)
    }
}

fn build_plan(model_path: &Path, width: usize) -> TractResult<Plan> {
    tract_onnx::onnx()
        .model_for_path(model_path)?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, width)),
        )?
        .into_optimized()?
        .into_runnable()
}

impl Predictor for OnnxPredictor {
    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let features: Vec<f32> = self
            .encoder
            .encode(row)?
            .into_iter()
            .map(|v| v as f32)
            .collect();

        self.run(&features)
            .map_err(|e| InferenceError::Backend(format!("{e:#}")))?
            .ok_or_else(|| InferenceError::Backend("model produced no output".into()))
    }

    fn columns(&self) -> Vec<ColumnSpec> {
        self.encoder.columns().to_vec()
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            backend: "onnx",
            source: self.source.clone(),
            columns: self.encoder.columns().to_vec(),
            estimators: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::tests::sample_request;
    use crate::inference::{load_predictor, InferenceAdapter};

    const LINEAR_FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/linear_energy.onnx"
    );

    // Fixture graph: MatMul with weights [100, 500, 200, 0.0625, 2, 4, 8, 0, -100]
    // over the encoded row, plus a bias of 1000.
    #[test]
    fn linear_graph_predicts_through_adapter() {
        let predictor = load_predictor(Path::new(LINEAR_FIXTURE)).unwrap();
        let info = predictor.describe();
        assert_eq!(info.backend, "onnx");
        assert_eq!(info.name, "linear_energy");
        assert_eq!(info.columns.len(), 6);

        let adapter = InferenceAdapter::new(predictor).unwrap();
        // 500 (Industrial) + 2500 + 240 + 320 + 224 + 0 (Weekday) + 1000
        assert_eq!(adapter.predict(&sample_request()).unwrap(), 4784.0);

        let mut weekend = sample_request();
        weekend.building_type = "Commercial".into();
        weekend.day_of_week = "Weekend".into();
        assert_eq!(adapter.predict(&weekend).unwrap(), 4284.0);
    }

    #[test]
    fn linear_graph_rejects_unseen_category() {
        let predictor = OnnxPredictor::load(LINEAR_FIXTURE).unwrap();
        let mut request = sample_request();
        request.building_type = "Castle".into();
        assert!(matches!(
            predictor.predict(&request.to_feature_row()),
            Err(InferenceError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn schema_sits_next_to_the_model() {
        assert_eq!(
            schema_path_for(Path::new("models/best_energy_model.onnx")),
            PathBuf::from("models/best_energy_model.schema.json")
        );
    }

    #[test]
    fn missing_schema_fails_before_touching_the_graph() {
        let err = OnnxPredictor::load("does/not/exist.onnx").err().unwrap();
        match err {
            ModelError::Io { path, .. } => assert!(path.ends_with("exist.schema.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_graph_is_an_onnx_error() {
        let dir = std::env::temp_dir().join(format!("energy-api-onnx-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let model = dir.join("broken.onnx");
        fs::write(&model, b"not a protobuf").unwrap();
        fs::write(
            schema_path_for(&model),
            r#"[{"kind": "numeric", "name": "Square Footage"}]"#,
        )
        .unwrap();

        let err = OnnxPredictor::load(&model).err().unwrap();
        assert!(matches!(err, ModelError::Onnx { .. }));
        fs::remove_dir_all(&dir).ok();
    }
}
