//! Performance -> retention dependency resolution
//!
//! The retention model takes a performance rating as input, and that rating
//! is itself the performance model's output. Stage 1 validates and predicts
//! performance on the full employee shape; the predicted class is shifted to
//! a one-based rating and injected into the retention record; stage 2 then
//! validates and predicts retention. A stage-1 failure aborts the chain.

use crate::engine::InferenceEngine;
use crate::error::PipelineError;
use crate::models::{fields, EmployeeRecord, FieldValue, ModelKind, PredictionResult};
use crate::validation::RuleSet;
use tracing::debug;

/// Performance model classes are zero-based, ratings are one-based
pub fn rating_from_class(class: f64) -> f64 {
    class + 1.0
}

/// Retention-stage input for `record` with the chained `rating`.
/// Any caller-supplied rating is overwritten.
pub fn retention_input(record: &EmployeeRecord, rating: f64) -> EmployeeRecord {
    let base = &fields::RETENTION_FIELDS[..fields::RETENTION_FIELDS.len() - 1];
    record
        .project(base)
        .derive_with(fields::PERFORMANCE_RATING, FieldValue::Number(rating))
}

/// Result of both stages for one subject
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub performance_rating: f64,
    pub retention_record: EmployeeRecord,
    pub retention: PredictionResult,
}

pub struct DependencyResolver<'a> {
    engine: &'a InferenceEngine,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(engine: &'a InferenceEngine) -> Self {
        Self { engine }
    }

    /// Chain for one record; validation fails fast at each stage
    pub fn resolve_single(&self, record: &EmployeeRecord) -> Result<ChainOutcome, PipelineError> {
        RuleSet::employee()
            .validate_record(record)
            .map_err(PipelineError::Invalid)?;
        let performance = self.engine.predict_one(ModelKind::Performance, record)?;
        let rating = rating_from_class(performance.value);

        let retention_record = retention_input(record, rating);
        RuleSet::retention()
            .validate_record(&retention_record)
            .map_err(PipelineError::Invalid)?;
        let retention = self
            .engine
            .predict_one(ModelKind::Retention, &retention_record)?;

        debug!(rating, retention = retention.value, "Chain resolved");
        Ok(ChainOutcome {
            performance_rating: rating,
            retention_record,
            retention,
        })
    }

    /// Chain for a whole table. Every rating is computed before any
    /// retention-stage validation runs, and each stage rejects the batch if
    /// any row fails.
    pub fn resolve_batch(
        &self,
        rows: &[(usize, EmployeeRecord)],
    ) -> Result<Vec<ChainOutcome>, PipelineError> {
        let errors = RuleSet::employee().validate_batch(rows.iter().map(|(idx, r)| (*idx, r)));
        if !errors.is_empty() {
            return Err(PipelineError::from_batch(errors));
        }

        let performance = self
            .engine
            .predict(ModelKind::Performance, rows.iter().map(|(_, r)| r))?;
        let ratings: Vec<f64> = performance
            .iter()
            .map(|p| rating_from_class(p.value))
            .collect();
        let retention_records: Vec<EmployeeRecord> = rows
            .iter()
            .zip(&ratings)
            .map(|((_, record), rating)| retention_input(record, *rating))
            .collect();

        let errors = RuleSet::retention().validate_batch(
            rows.iter()
                .map(|(idx, _)| *idx)
                .zip(retention_records.iter()),
        );
        if !errors.is_empty() {
            return Err(PipelineError::from_batch(errors));
        }

        let retention = self
            .engine
            .predict(ModelKind::Retention, &retention_records)?;

        Ok(ratings
            .into_iter()
            .zip(retention_records)
            .zip(retention)
            .map(|((performance_rating, retention_record), retention)| ChainOutcome {
                performance_rating,
                retention_record,
                retention,
            })
            .collect())
    }
}
