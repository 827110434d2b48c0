use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;

use crate::error::{PredictorError, PredictorResult};
use crate::models::{FeatureVector, PredictionResult, FEATURE_NAMES};

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Class value the classifier uses for "is a LinkedIn user".
pub const POSITIVE_LABEL: i64 = 1;

/// A fitted binary classifier.
///
/// `predict_proba` returns one `[negative, positive]` pair per row.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, rows: &[FeatureVector]) -> PredictorResult<Vec<i64>>;

    fn predict_proba(&self, rows: &[FeatureVector]) -> PredictorResult<Vec<[f32; 2]>>;

    /// Labels and probabilities together. Backends that produce both from one
    /// evaluation override this to avoid running the model twice.
    fn predict_scored(
        &self,
        rows: &[FeatureVector],
    ) -> PredictorResult<(Vec<i64>, Vec<[f32; 2]>)> {
        Ok((self.predict(rows)?, self.predict_proba(rows)?))
    }
}

/// Runs the classifier on a single row.
///
/// The label decides `predicted_class`; the probability is returned as the
/// model produced it, even outside [0, 1].
pub fn predict(model: &dyn Classifier, features: &FeatureVector) -> PredictorResult<PredictionResult> {
    let mut results = predict_batch(model, std::slice::from_ref(features))?;
    results
        .pop()
        .ok_or_else(|| PredictorError::MalformedOutput("aucun résultat".to_string()))
}

pub fn predict_batch(
    model: &dyn Classifier,
    rows: &[FeatureVector],
) -> PredictorResult<Vec<PredictionResult>> {
    if rows.is_empty() {
        return Err(PredictorError::EmptyBatch);
    }

    let (labels, probabilities) = model.predict_scored(rows)?;

    if labels.len() != rows.len() || probabilities.len() != rows.len() {
        return Err(PredictorError::MalformedOutput(format!(
            "{} lignes envoyées, {} labels et {} probabilités reçus",
            rows.len(),
            labels.len(),
            probabilities.len()
        )));
    }

    Ok(labels
        .into_iter()
        .zip(probabilities)
        .map(|(label, proba)| {
            let positive_probability = proba[1];
            if !(0.0..=1.0).contains(&positive_probability) {
                warn!(
                    "Probabilité hors de [0, 1] renvoyée par {}: {}",
                    model.name(),
                    positive_probability
                );
            }
            PredictionResult {
                predicted_class: label == POSITIVE_LABEL,
                positive_probability,
            }
        })
        .collect())
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX export of the classifier (label output first, probabilities second).
pub struct OnnxClassifier {
    plan: OnnxPlan,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P) -> TractResult<Self> {
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { plan })
    }

    fn run_row(&self, row: &FeatureVector) -> PredictorResult<(i64, [f32; 2])> {
        let input = Tensor::from_shape(&[1, FEATURE_COUNT], &row.to_array())?;
        let outputs = self.plan.run(tvec!(input.into()))?;

        if outputs.len() < 2 {
            return Err(PredictorError::MalformedOutput(format!(
                "{} sortie(s), label et probabilités attendus",
                outputs.len()
            )));
        }

        let labels = outputs[0].cast_to::<i64>()?;
        let label = *labels
            .as_slice::<i64>()?
            .first()
            .ok_or_else(|| PredictorError::MalformedOutput("label absent".to_string()))?;

        let proba = outputs[1].to_array_view::<f32>()?;
        let proba: Vec<f32> = proba.iter().copied().collect();
        match proba.as_slice() {
            [negative, positive] => Ok((label, [*negative, *positive])),
            other => Err(PredictorError::MalformedOutput(format!(
                "{} probabilités par ligne, 2 attendues",
                other.len()
            ))),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn predict(&self, rows: &[FeatureVector]) -> PredictorResult<Vec<i64>> {
        rows.iter().map(|row| self.run_row(row).map(|(label, _)| label)).collect()
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> PredictorResult<Vec<[f32; 2]>> {
        rows.iter().map(|row| self.run_row(row).map(|(_, proba)| proba)).collect()
    }

    fn predict_scored(
        &self,
        rows: &[FeatureVector],
    ) -> PredictorResult<(Vec<i64>, Vec<[f32; 2]>)> {
        let scored = rows
            .iter()
            .map(|row| self.run_row(row))
            .collect::<PredictorResult<Vec<_>>>()?;
        Ok(scored.into_iter().unzip())
    }
}

fn default_classes() -> [i64; 2] {
    [0, POSITIVE_LABEL]
}

/// Coefficients of a fitted logistic regression, as exported to JSON.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogisticArtifact {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f32>,
    pub intercept: f32,
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    coefficients: [f32; FEATURE_COUNT],
    intercept: f32,
    classes: [i64; 2],
}

impl LogisticClassifier {
    pub fn new(coefficients: [f32; FEATURE_COUNT], intercept: f32) -> Self {
        Self {
            coefficients,
            intercept,
            classes: default_classes(),
        }
    }

    pub fn from_artifact(artifact: LogisticArtifact) -> PredictorResult<Self> {
        if artifact.feature_names != FEATURE_NAMES {
            return Err(PredictorError::SchemaMismatch {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                found: artifact.feature_names,
            });
        }

        let coefficients: [f32; FEATURE_COUNT] =
            artifact.coefficients.as_slice().try_into().map_err(|_| {
                PredictorError::MalformedOutput(format!(
                    "{} coefficients, {} attendus",
                    artifact.coefficients.len(),
                    FEATURE_COUNT
                ))
            })?;

        Ok(Self {
            coefficients,
            intercept: artifact.intercept,
            classes: artifact.classes,
        })
    }

    pub fn read_artifact<P: AsRef<Path>>(path: P) -> anyhow::Result<LogisticArtifact> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn score(&self, row: &FeatureVector) -> f32 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.to_array())
                .map(|(w, x)| w * x)
                .sum::<f32>()
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn predict(&self, rows: &[FeatureVector]) -> PredictorResult<Vec<i64>> {
        Ok(rows
            .iter()
            .map(|row| {
                if self.score(row) > 0.0 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            })
            .collect())
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> PredictorResult<Vec<[f32; 2]>> {
        Ok(rows
            .iter()
            .map(|row| {
                let p = 1.0 / (1.0 + (-self.score(row)).exp()); // sigmoid
                [1.0 - p, p]
            })
            .collect())
    }
}

/// Loads the classifier matching the artifact's extension (`.onnx` or `.json`).
pub fn load_classifier(path: &Path) -> PredictorResult<Arc<dyn Classifier>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let load_error = |source: anyhow::Error| PredictorError::ModelLoad {
        path: path.to_path_buf(),
        source,
    };

    let model: Arc<dyn Classifier> = match extension.as_deref() {
        Some("onnx") => Arc::new(OnnxClassifier::load(path).map_err(load_error)?),
        Some("json") => {
            let artifact = LogisticClassifier::read_artifact(path).map_err(load_error)?;
            Arc::new(LogisticClassifier::from_artifact(artifact)?)
        }
        _ => return Err(PredictorError::UnsupportedModelFormat(path.to_path_buf())),
    };

    info!("Modèle {} chargé depuis {}", model.name(), path.display());
    Ok(model)
}

/// Holds the classifier once it has been loaded.
///
/// Concurrent first callers block on a single load and all receive the same `Arc`.
pub struct ModelCell {
    cell: OnceCell<Arc<dyn Classifier>>,
}

impl ModelCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get_or_load<F>(&self, load: F) -> PredictorResult<Arc<dyn Classifier>>
    where
        F: FnOnce() -> PredictorResult<Arc<dyn Classifier>>,
    {
        self.cell.get_or_try_init(load).map(Arc::clone)
    }

    pub fn get(&self) -> Option<Arc<dyn Classifier>> {
        self.cell.get().cloned()
    }
}

impl Default for ModelCell {
    fn default() -> Self {
        Self::new()
    }
}

static MODEL: ModelCell = ModelCell::new();

pub fn get_model(path: &Path) -> PredictorResult<Arc<dyn Classifier>> {
    MODEL.get_or_load(|| {
        debug!("Premier accès au modèle, chargement de {}", path.display());
        load_classifier(path)
    })
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub backend: &'static str,
    pub input_shape: Vec<usize>,
    pub features: Vec<&'static str>,
    pub positive_label: i64,
}

impl ModelInfo {
    pub fn describe(model: &dyn Classifier) -> Self {
        ModelInfo {
            backend: model.name(),
            input_shape: vec![1, FEATURE_COUNT],
            features: FEATURE_NAMES.to_vec(),
            positive_label: POSITIVE_LABEL,
        }
    }
}
