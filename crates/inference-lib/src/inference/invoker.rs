//! Model invoker: runs a prepared feature matrix through a loaded model

use super::Model;
use crate::error::InferenceError;
use crate::models::{FeatureMatrix, ModelKind, PredictionResult};
use crate::observability::InferenceMetrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
pub const MAX_INFERENCE_MS: u128 = 50;

/// A model plus the capabilities discovered when it was loaded
#[derive(Clone)]
pub struct LoadedModel {
    kind: ModelKind,
    version: String,
    model: Arc<dyn Model>,
    supports_probabilities: bool,
    terminal_supports_probabilities: bool,
}

impl LoadedModel {
    pub fn new(kind: ModelKind, version: impl Into<String>, model: Arc<dyn Model>) -> Self {
        let supports_probabilities = model.as_probabilistic().is_some();
        let terminal_supports_probabilities = model
            .terminal_stage()
            .map(|t| t.as_probabilistic().is_some())
            .unwrap_or(false);
        Self {
            kind,
            version: version.into(),
            model,
            supports_probabilities,
            terminal_supports_probabilities,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn supports_probabilities(&self) -> bool {
        self.supports_probabilities
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("model", &self.model.describe())
            .field("supports_probabilities", &self.supports_probabilities)
            .finish()
    }
}

/// Calls models, with an optional degraded-mode fallback to the terminal
/// estimator when the structured call rejects the column layout
#[derive(Clone)]
pub struct ModelInvoker {
    estimator_fallback: bool,
    metrics: InferenceMetrics,
}

impl ModelInvoker {
    pub fn new(estimator_fallback: bool) -> Self {
        Self {
            estimator_fallback,
            metrics: InferenceMetrics::new(),
        }
    }

    pub fn estimator_fallback(&self) -> bool {
        self.estimator_fallback
    }

    /// One result per matrix row
    pub fn invoke(
        &self,
        model: &LoadedModel,
        matrix: &FeatureMatrix,
    ) -> Result<Vec<PredictionResult>, InferenceError> {
        let start = Instant::now();
        let results = match run(model.model.as_ref(), model.supports_probabilities, matrix) {
            Ok(results) => results,
            Err(err) if err.is_column_mismatch() && self.estimator_fallback => {
                let Some(terminal) = model.model.terminal_stage() else {
                    return Err(err);
                };
                warn!(
                    event = "estimator_fallback",
                    model = %model.kind,
                    error = %err,
                    "Structured invocation rejected columns, retrying terminal estimator with raw values"
                );
                self.metrics.inc_estimator_fallbacks(model.kind.as_str());
                run(
                    terminal,
                    model.terminal_supports_probabilities,
                    &matrix.anonymous(),
                )?
            }
            Err(err) => return Err(err),
        };

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                model = %model.kind,
                rows = matrix.n_rows(),
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(model = %model.kind, rows = matrix.n_rows(), elapsed_us = elapsed.as_micros(), "Inference completed");
        }
        Ok(results)
    }
}

fn run(
    model: &dyn Model,
    with_probabilities: bool,
    matrix: &FeatureMatrix,
) -> Result<Vec<PredictionResult>, InferenceError> {
    let values = model.predict(matrix)?;
    check_len(matrix.n_rows(), values.len())?;

    let probabilities = match model.as_probabilistic().filter(|_| with_probabilities) {
        Some(proba) => {
            let distributions = proba.predict_proba(matrix)?;
            check_len(matrix.n_rows(), distributions.len())?;
            distributions.into_iter().map(Some).collect()
        }
        None => vec![None; values.len()],
    };

    Ok(values
        .into_iter()
        .zip(probabilities)
        .map(|(value, probabilities)| PredictionResult {
            value,
            probabilities,
        })
        .collect())
}

fn check_len(expected: usize, actual: usize) -> Result<(), InferenceError> {
    if expected != actual {
        return Err(InferenceError::OutputLength { expected, actual });
    }
    Ok(())
}
