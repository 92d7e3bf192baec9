//! Preprocess-then-invoke for one model

use crate::error::{InferenceError, PipelineError};
use crate::inference::ModelInvoker;
use crate::models::{EmployeeRecord, ModelKind, PredictionResult};
use crate::preprocess::FeaturePreprocessor;
use crate::registry::ModelRegistry;
use std::sync::Arc;
use tracing::debug;

/// Runs validated records through a model's contract and the model itself.
/// Validation is the caller's job; records reaching here are trusted.
#[derive(Clone)]
pub struct InferenceEngine {
    registry: Arc<ModelRegistry>,
    preprocessor: FeaturePreprocessor,
    invoker: ModelInvoker,
}

impl InferenceEngine {
    pub fn new(registry: Arc<ModelRegistry>, invoker: ModelInvoker) -> Self {
        Self {
            registry,
            preprocessor: FeaturePreprocessor::new(),
            invoker,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// One result per record, in input order
    pub fn predict<'a, I>(
        &self,
        kind: ModelKind,
        records: I,
    ) -> Result<Vec<PredictionResult>, PipelineError>
    where
        I: IntoIterator<Item = &'a EmployeeRecord>,
    {
        let (contract, model) = self.registry.get(kind)?;
        let matrix = self.preprocessor.transform(records, contract)?;
        if matrix.n_rows() == 0 {
            return Ok(Vec::new());
        }
        debug!(model = %kind, rows = matrix.n_rows(), cols = matrix.n_cols(), "Invoking model");
        Ok(self.invoker.invoke(model, &matrix)?)
    }

    /// Single-record convenience over [`InferenceEngine::predict`]
    pub fn predict_one(
        &self,
        kind: ModelKind,
        record: &EmployeeRecord,
    ) -> Result<PredictionResult, PipelineError> {
        self.predict(kind, [record])?
            .into_iter()
            .next()
            .ok_or(PipelineError::Inference(InferenceError::EmptyOutput))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::test_support::{linear_engine, valid_employee};

    #[test]
    fn test_predict_is_deterministic() {
        let engine = linear_engine();
        let record = valid_employee();
        for kind in [ModelKind::Attrition, ModelKind::Performance] {
            let first = engine.predict_one(kind, &record).unwrap();
            let second = engine.predict_one(kind, &record).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_one_result_per_record() {
        let engine = linear_engine();
        let records = vec![valid_employee(); 7];
        let results = engine.predict(ModelKind::Attrition, &records).unwrap();
        assert_eq!(results.len(), 7);
        assert!(engine
            .predict(ModelKind::Attrition, &Vec::<EmployeeRecord>::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_model_is_internal_error() {
        let engine = InferenceEngine::new(Arc::new(ModelRegistry::new()), ModelInvoker::new(false));
        let err = engine
            .predict_one(ModelKind::Retention, &valid_employee())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Unavailable(RegistryError::MissingModel(_))
        ));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_unencodable_category_is_preprocess_error() {
        let record = valid_employee().with("Department", "Legal");
        let err = linear_engine()
            .predict_one(ModelKind::Performance, &record)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
    }
}
