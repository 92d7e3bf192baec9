//! Two-stage model: an input stage that checks column identities, then a
//! terminal estimator that only sees numbers

use super::{Model, ProbabilisticModel};
use crate::error::InferenceError;
use crate::models::FeatureMatrix;

pub struct PipelineModel {
    input_features: Vec<String>,
    estimator: Box<dyn Model>,
}

impl PipelineModel {
    pub fn new(input_features: Vec<String>, estimator: Box<dyn Model>) -> Self {
        Self {
            input_features,
            estimator,
        }
    }

    pub fn input_features(&self) -> &[String] {
        &self.input_features
    }

    /// Named matrices must match the training layout exactly
    fn check_columns(&self, inputs: &FeatureMatrix) -> Result<(), InferenceError> {
        if inputs.is_named() && inputs.columns() != self.input_features.as_slice() {
            return Err(InferenceError::ColumnMismatch {
                expected: self.input_features.clone(),
                actual: inputs.columns().to_vec(),
            });
        }
        Ok(())
    }
}

impl Model for PipelineModel {
    fn predict(&self, inputs: &FeatureMatrix) -> Result<Vec<f64>, InferenceError> {
        self.check_columns(inputs)?;
        self.estimator.predict(inputs)
    }

    fn as_probabilistic(&self) -> Option<&dyn ProbabilisticModel> {
        self.estimator.as_probabilistic().map(|_| self as &dyn ProbabilisticModel)
    }

    fn terminal_stage(&self) -> Option<&dyn Model> {
        Some(self.estimator.as_ref())
    }

    fn describe(&self) -> String {
        format!(
            "pipeline({} named inputs -> {})",
            self.input_features.len(),
            self.estimator.describe()
        )
    }
}

impl ProbabilisticModel for PipelineModel {
    fn predict_proba(&self, inputs: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
        self.check_columns(inputs)?;
        match self.estimator.as_probabilistic() {
            Some(estimator) => estimator.predict_proba(inputs),
            None => Err(InferenceError::Backend(
                "terminal estimator has no probability output".to_string(),
            )),
        }
    }
}
