//! Error taxonomy for the inference pipeline
//!
//! Validation problems are reported to the caller and never retried.
//! Preprocessing and inference problems indicate a contract violation
//! between the request schema and a model, and surface as internal errors.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Maximum number of batch validation failures surfaced to the caller
pub const MAX_REPORTED_ERRORS: usize = 10;

/// A single rule violation, optionally tied to a batch row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub row: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row: None,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "Row {}: {}", row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error, PartialEq)]
pub enum PreprocessError {
    #[error("column {column} expects a numeric value, got '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("column {column} has no encoding for category '{value}'")]
    UnencodableCategory { column: String, value: String },

    #[error("row {row} produced {actual} columns, contract requires {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("feature names mismatch: model expects {expected:?}, got {actual:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("model expects {expected} input columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model returned {actual} outputs for {expected} rows")]
    OutputLength { expected: usize, actual: usize },

    #[error("model produced no output")]
    EmptyOutput,

    #[error("inference backend failed: {0}")]
    Backend(String),
}

impl InferenceError {
    /// Column-identity mismatches are the only failures eligible for the
    /// terminal-estimator fallback
    pub fn is_column_mismatch(&self) -> bool {
        matches!(self, InferenceError::ColumnMismatch { .. })
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model manifest: {0}")]
    Manifest(String),

    #[error("checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    Checksum {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("failed to load artifact {artifact}: {reason}")]
    Artifact { artifact: String, reason: String },

    #[error("no model registered for {0}")]
    MissingModel(String),
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("audit log lock poisoned")]
    Poisoned,
}

/// Endpoint-level failure, the only error type handlers see
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Invalid(ValidationError),

    #[error("{total} validation errors")]
    InvalidBatch {
        errors: Vec<ValidationError>,
        total: usize,
    },

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Invalid data format: {0}")]
    MalformedUpload(String),

    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("Prediction error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Model unavailable: {0}")]
    Unavailable(#[from] RegistryError),
}

impl PipelineError {
    /// Build a batch rejection from every accumulated failure, keeping only
    /// the first [`MAX_REPORTED_ERRORS`]
    pub fn from_batch(mut errors: Vec<ValidationError>) -> Self {
        let total = errors.len();
        errors.truncate(MAX_REPORTED_ERRORS);
        PipelineError::InvalidBatch { errors, total }
    }

    /// True for failures caused by the caller's input (HTTP 400)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Invalid(_)
                | PipelineError::InvalidBatch { .. }
                | PipelineError::MissingColumns(_)
                | PipelineError::MalformedUpload(_)
        )
    }

    /// Human-readable messages for the response body
    pub fn messages(&self) -> Vec<String> {
        match self {
            PipelineError::InvalidBatch { errors, .. } => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}
