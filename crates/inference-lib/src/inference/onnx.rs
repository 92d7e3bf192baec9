//! ONNX inference using tract
//!
//! Runs classifiers exported to ONNX (label output first, optional
//! probability output second). Rows are evaluated one at a time against a
//! plan optimized for a `[1, n_features]` input.

use super::{Model, ProbabilisticModel};
use crate::error::InferenceError;
use crate::models::FeatureMatrix;
use anyhow::{Context, Result};
use tract_onnx::prelude::*;
use tracing::debug;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-backed model; immutable after load and shared across requests
pub struct OnnxModel {
    plan: TractModel,
    num_features: usize,
    num_outputs: usize,
}

impl OnnxModel {
    /// Parse and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8], num_features: usize) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        let num_outputs = plan
            .model()
            .output_outlets()
            .context("Failed to read model outputs")?
            .len();
        if num_outputs == 0 {
            anyhow::bail!("ONNX model declares no outputs");
        }

        debug!(num_features, num_outputs, "ONNX model loaded");
        Ok(Self {
            plan,
            num_features,
            num_outputs,
        })
    }

    fn check_width(&self, inputs: &FeatureMatrix) -> Result<(), InferenceError> {
        let actual = inputs.n_cols();
        if inputs.n_rows() > 0 && actual != self.num_features {
            return Err(InferenceError::ShapeMismatch {
                expected: self.num_features,
                actual,
            });
        }
        Ok(())
    }

    fn run_row(&self, row: &[f64]) -> Result<TVec<TValue>, InferenceError> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .map_err(|e| InferenceError::Backend(e.to_string()))?
            .into();
        self.plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Backend(e.to_string()))
    }

    fn output_values(outputs: &TVec<TValue>, index: usize) -> Result<Vec<f64>, InferenceError> {
        let output = outputs.get(index).ok_or(InferenceError::EmptyOutput)?;
        let cast = output
            .cast_to::<f64>()
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        let values = cast
            .as_slice::<f64>()
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        Ok(values.to_vec())
    }
}

impl Model for OnnxModel {
    fn predict(&self, inputs: &FeatureMatrix) -> Result<Vec<f64>, InferenceError> {
        self.check_width(inputs)?;
        inputs
            .rows()
            .iter()
            .map(|row| {
                let outputs = self.run_row(row)?;
                Self::output_values(&outputs, 0)?
                    .first()
                    .copied()
                    .ok_or(InferenceError::EmptyOutput)
            })
            .collect()
    }

    fn as_probabilistic(&self) -> Option<&dyn ProbabilisticModel> {
        if self.num_outputs >= 2 {
            Some(self)
        } else {
            None
        }
    }

    fn describe(&self) -> String {
        format!(
            "onnx({} inputs, {} outputs)",
            self.num_features, self.num_outputs
        )
    }
}

impl ProbabilisticModel for OnnxModel {
    fn predict_proba(&self, inputs: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
        self.check_width(inputs)?;
        inputs
            .rows()
            .iter()
            .map(|row| {
                let outputs = self.run_row(row)?;
                Self::output_values(&outputs, 1)
            })
            .collect()
    }
}
