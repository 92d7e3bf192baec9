//! Endpoint-level operations
//!
//! Each method is the whole synchronous request path for one endpoint:
//! validate, predict, audit, record metrics. Transport layers call these
//! and only map [`PipelineError`] to a status code.

use crate::audit::{AuditEntry, AuditLogger};
use crate::batch::{BatchJob, BatchProcessor};
use crate::chain::{rating_from_class, DependencyResolver};
use crate::engine::InferenceEngine;
use crate::error::PipelineError;
use crate::models::{
    endpoints, fields, AttritionPrediction, BulkAttritionRow, BulkPerformanceRow, BulkResponse,
    BulkRetentionRow, EmployeeRecord, ModelKind, PerformancePrediction, RetentionPrediction,
};
use crate::observability::{InferenceMetrics, StructuredLogger};
use crate::validation::RuleSet;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// Positive class of the attrition model
const ATTRITION_POSITIVE_CLASS: usize = 1;

/// Fixed record used for the startup prediction check
pub fn sample_record() -> EmployeeRecord {
    EmployeeRecord::new()
        .with("Age", 35.0)
        .with("Gender", "Male")
        .with("Department", "Sales")
        .with("JobRole", "Manager")
        .with("MonthlyIncome", 10000.0)
        .with("YearsAtCompany", 10.0)
        .with("OverTime", "No")
        .with("JobSatisfaction", 5.0)
        .with("WorkLifeBalance", 5.0)
        .with("TotalWorkingYears", 15.0)
        .with("TrainingTimesLastYear", 5.0)
        .with("JobInvolvement", 5.0)
        .with("EnvironmentSatisfaction", 5.0)
        .with("RelationshipSatisfaction", 5.0)
}

pub struct PredictionService {
    engine: InferenceEngine,
    audit: AuditLogger,
    metrics: InferenceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(engine: InferenceEngine, audit: AuditLogger, logger: StructuredLogger) -> Self {
        Self {
            engine,
            audit,
            metrics: InferenceMetrics::new(),
            logger,
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn predict_attrition(&self, input: &Value) -> Result<AttritionPrediction, PipelineError> {
        self.serve(endpoints::PREDICT_ATTRITION, || {
            let record = single_record(input)?;
            RuleSet::employee()
                .validate_record(&record)
                .map_err(PipelineError::Invalid)?;
            let result = self.engine.predict_one(ModelKind::Attrition, &record)?;
            let prediction = AttritionPrediction {
                attrition_risk: result.value,
                attrition_risk_probability: result.probability_of(ATTRITION_POSITIVE_CLASS),
            };
            self.audit_one(endpoints::PREDICT_ATTRITION, input.clone(), &prediction);
            Ok((prediction, 1))
        })
    }

    pub fn predict_performance(
        &self,
        input: &Value,
    ) -> Result<PerformancePrediction, PipelineError> {
        self.serve(endpoints::PREDICT_PERFORMANCE, || {
            let record = single_record(input)?;
            RuleSet::employee()
                .validate_record(&record)
                .map_err(PipelineError::Invalid)?;
            let result = self.engine.predict_one(ModelKind::Performance, &record)?;
            let prediction = PerformancePrediction {
                performance_rating: rating_from_class(result.value),
            };
            self.audit_one(endpoints::PREDICT_PERFORMANCE, input.clone(), &prediction);
            Ok((prediction, 1))
        })
    }

    pub fn predict_retention(&self, input: &Value) -> Result<RetentionPrediction, PipelineError> {
        self.serve(endpoints::PREDICT_RETENTION, || {
            let record = single_record(input)?;
            let outcome = DependencyResolver::new(&self.engine).resolve_single(&record)?;
            let prediction = RetentionPrediction {
                retention_risk: outcome.retention.value,
                retention_risk_probability: outcome.retention.probability_of_predicted(),
            };
            let audited = record
                .derive_with(fields::PERFORMANCE_RATING, outcome.performance_rating.into())
                .to_json();
            self.audit_one(endpoints::PREDICT_RETENTION, audited, &prediction);
            Ok((prediction, 1))
        })
    }

    pub fn predict_attrition_bulk(
        &self,
        upload: &[u8],
    ) -> Result<BulkResponse<BulkAttritionRow>, PipelineError> {
        self.serve(endpoints::PREDICT_ATTRITION_BULK, || {
            let job = self.parse_upload(upload)?;
            let results = BatchProcessor::new(&self.engine).run(&job, ModelKind::Attrition)?;
            let predictions: Vec<_> = results
                .into_iter()
                .map(|(idx, result)| BulkAttritionRow {
                    employee_index: idx,
                    prediction: AttritionPrediction {
                        attrition_risk: result.value,
                        attrition_risk_probability: result
                            .probability_of(ATTRITION_POSITIVE_CLASS),
                    },
                })
                .collect();
            self.audit_rows(endpoints::PREDICT_ATTRITION_BULK, &job, &predictions);
            let rows = predictions.len();
            Ok((BulkResponse { predictions }, rows))
        })
    }

    pub fn predict_performance_bulk(
        &self,
        upload: &[u8],
    ) -> Result<BulkResponse<BulkPerformanceRow>, PipelineError> {
        self.serve(endpoints::PREDICT_PERFORMANCE_BULK, || {
            let job = self.parse_upload(upload)?;
            let results = BatchProcessor::new(&self.engine).run(&job, ModelKind::Performance)?;
            let predictions: Vec<_> = results
                .into_iter()
                .map(|(idx, result)| BulkPerformanceRow {
                    employee_index: idx,
                    prediction: PerformancePrediction {
                        performance_rating: rating_from_class(result.value),
                    },
                })
                .collect();
            self.audit_rows(endpoints::PREDICT_PERFORMANCE_BULK, &job, &predictions);
            let rows = predictions.len();
            Ok((BulkResponse { predictions }, rows))
        })
    }

    pub fn predict_retention_bulk(
        &self,
        upload: &[u8],
    ) -> Result<BulkResponse<BulkRetentionRow>, PipelineError> {
        self.serve(endpoints::PREDICT_RETENTION_BULK, || {
            let job = self.parse_upload(upload)?;
            let outcomes = BatchProcessor::new(&self.engine).run_chain(&job)?;
            let predictions: Vec<_> = outcomes
                .into_iter()
                .map(|(idx, outcome)| BulkRetentionRow {
                    employee_index: idx,
                    prediction: RetentionPrediction {
                        retention_risk: outcome.retention.value,
                        retention_risk_probability: outcome.retention.probability_of_predicted(),
                    },
                    performance_rating: outcome.performance_rating,
                })
                .collect();

            // The audited input carries the chained rating alongside the row
            for (row, (_, record)) in predictions.iter().zip(job.rows()) {
                let input = record
                    .derive_with(
                        fields::PERFORMANCE_RATING,
                        row.performance_rating.into(),
                    )
                    .to_json();
                self.audit_one(endpoints::PREDICT_RETENTION_BULK, input, row);
            }
            let rows = predictions.len();
            Ok((BulkResponse { predictions }, rows))
        })
    }

    /// Run the fixed sample record through every model once
    pub fn smoke_test(&self) -> Result<(), PipelineError> {
        let record = sample_record();
        let outcome = self
            .engine
            .predict_one(ModelKind::Attrition, &record)
            .and_then(|_| DependencyResolver::new(&self.engine).resolve_single(&record));
        match &outcome {
            Ok(_) => self.logger.log_smoke_test(true, ""),
            Err(e) => self.logger.log_smoke_test(false, &e.to_string()),
        }
        outcome.map(|_| ())
    }

    fn parse_upload(&self, upload: &[u8]) -> Result<BatchJob, PipelineError> {
        let job = BatchJob::from_csv(upload)?;
        self.metrics.observe_batch_rows(job.len());
        Ok(job)
    }

    fn audit_one<T: Serialize>(&self, endpoint: &str, input: Value, prediction: &T) {
        let prediction = serde_json::to_value(prediction).unwrap_or(Value::Null);
        self.audit
            .record(&AuditEntry::new(endpoint, input, prediction));
    }

    /// One entry per row; `predictions` is in the job's row order
    fn audit_rows<T: Serialize>(&self, endpoint: &str, job: &BatchJob, predictions: &[T]) {
        for (prediction, (_, record)) in predictions.iter().zip(job.rows()) {
            self.audit_one(endpoint, record.to_json(), prediction);
        }
    }

    /// Timing, metrics and logging shared by every endpoint
    fn serve<T>(
        &self,
        endpoint: &str,
        handler: impl FnOnce() -> Result<(T, usize), PipelineError>,
    ) -> Result<T, PipelineError> {
        let start = Instant::now();
        match handler() {
            Ok((response, rows)) => {
                let elapsed = start.elapsed();
                self.metrics.observe_latency(endpoint, elapsed.as_secs_f64());
                self.metrics.inc_predictions(endpoint, rows);
                self.logger
                    .log_prediction(endpoint, rows, elapsed.as_secs_f64() * 1000.0);
                Ok(response)
            }
            Err(err) => {
                if err.is_client_error() {
                    self.metrics.inc_validation_failures(endpoint);
                } else {
                    self.metrics.inc_inference_errors(endpoint);
                }
                self.logger
                    .log_rejection(endpoint, &err.to_string(), err.is_client_error());
                Err(err)
            }
        }
    }
}

fn single_record(input: &Value) -> Result<EmployeeRecord, PipelineError> {
    match input {
        Value::Object(map) => Ok(EmployeeRecord::from_json_map(map)),
        _ => Err(PipelineError::MalformedUpload(
            "expected a JSON object".to_string(),
        )),
    }
}
