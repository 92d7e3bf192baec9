//! Tabular uploads
//!
//! A batch is all-or-nothing at the response level: missing columns reject
//! it before any row is looked at, and any row-level violation rejects the
//! whole table (only the first few violations are reported).

use crate::chain::{ChainOutcome, DependencyResolver};
use crate::engine::InferenceEngine;
use crate::error::PipelineError;
use crate::models::{fields, EmployeeRecord, FieldValue, ModelKind, PredictionResult};
use crate::validation::RuleSet;
use csv::{ReaderBuilder, Trim};
use tracing::{debug, info};

/// An uploaded table: header plus rows tagged with their zero-based position
#[derive(Debug, Clone, Default)]
pub struct BatchJob {
    columns: Vec<String>,
    rows: Vec<(usize, EmployeeRecord)>,
}

impl BatchJob {
    /// Parse a CSV upload with a header row
    pub fn from_csv(bytes: &[u8]) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| PipelineError::MalformedUpload(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| PipelineError::MalformedUpload(e.to_string()))?;
            if record.len() > columns.len() {
                return Err(PipelineError::MalformedUpload(format!(
                    "row {} has {} fields, expected {}",
                    idx,
                    record.len(),
                    columns.len()
                )));
            }
            // Short rows are padded with missing cells
            let employee = columns
                .iter()
                .enumerate()
                .fold(EmployeeRecord::new(), |acc, (i, name)| {
                    let cell = record.get(i).unwrap_or("");
                    acc.with(name.as_str(), FieldValue::from_cell(cell))
                });
            rows.push((idx, employee));
        }

        debug!(columns = columns.len(), rows = rows.len(), "Parsed upload");
        Ok(Self { columns, rows })
    }

    /// Table built from already-parsed records, indexed by position
    pub fn from_records(columns: Vec<String>, records: Vec<EmployeeRecord>) -> Self {
        Self {
            columns,
            rows: records.into_iter().enumerate().collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[(usize, EmployeeRecord)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reject the table if any of `required` is not a header
    pub fn require_columns(&self, required: &[&str]) -> Result<(), PipelineError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !self.columns.iter().any(|c| c == *name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::MissingColumns(missing))
        }
    }
}

/// Applies validation and prediction across a [`BatchJob`]
pub struct BatchProcessor<'a> {
    engine: &'a InferenceEngine,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(engine: &'a InferenceEngine) -> Self {
        Self { engine }
    }

    /// Single-model batch: (row index, result) for every row
    pub fn run(
        &self,
        job: &BatchJob,
        kind: ModelKind,
    ) -> Result<Vec<(usize, PredictionResult)>, PipelineError> {
        job.require_columns(&fields::EMPLOYEE_FIELDS)?;

        let errors = RuleSet::employee().validate_batch(job.rows.iter().map(|(idx, r)| (*idx, r)));
        if !errors.is_empty() {
            info!(model = %kind, rows = job.len(), failures = errors.len(), "Batch rejected");
            return Err(PipelineError::from_batch(errors));
        }

        let results = self
            .engine
            .predict(kind, job.rows.iter().map(|(_, r)| r))?;
        Ok(job.rows.iter().map(|(idx, _)| *idx).zip(results).collect())
    }

    /// Chained performance -> retention batch. Only the first stage's
    /// columns are required up front; the rating is produced here.
    pub fn run_chain(&self, job: &BatchJob) -> Result<Vec<(usize, ChainOutcome)>, PipelineError> {
        job.require_columns(&fields::EMPLOYEE_FIELDS)?;
        let outcomes = DependencyResolver::new(self.engine).resolve_batch(&job.rows)?;
        Ok(job.rows.iter().map(|(idx, _)| *idx).zip(outcomes).collect())
    }
}
