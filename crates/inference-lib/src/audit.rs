//! Append-only prediction audit log
//!
//! One JSON line per successful prediction (per row for bulk requests).
//! Writes are serialized behind a single file handle so concurrent requests
//! never interleave within an entry. A failed write is logged and counted;
//! it never fails the response.

use crate::error::AuditError;
use crate::observability::InferenceMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// (endpoint, original input, computed prediction)
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub input: Value,
    pub prediction: Value,
}

impl AuditEntry {
    pub fn new(endpoint: &str, input: Value, prediction: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            endpoint: endpoint.to_string(),
            input,
            prediction,
        }
    }
}

pub struct AuditLogger {
    sink: Option<Mutex<File>>,
    path: Option<PathBuf>,
    metrics: InferenceMetrics,
}

impl AuditLogger {
    /// Open (or create) the log in append mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Audit log opened");
        Ok(Self::from_file(file, path))
    }

    /// Log writing to an already-open handle
    pub fn from_file(file: File, path: PathBuf) -> Self {
        Self {
            sink: Some(Mutex::new(file)),
            path: Some(path),
            metrics: InferenceMetrics::new(),
        }
    }

    /// Logger that drops every entry
    pub fn disabled() -> Self {
        Self {
            sink: None,
            path: None,
            metrics: InferenceMetrics::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one entry; failures are logged, never returned
    pub fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.try_record(entry) {
            self.metrics.inc_audit_write_errors();
            warn!(error = %e, endpoint = %entry.endpoint, "Failed to write audit entry");
        }
    }

    fn try_record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = sink.lock().map_err(|_| AuditError::Poisoned)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("path", &self.path)
            .finish()
    }
}
