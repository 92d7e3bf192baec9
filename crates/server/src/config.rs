//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Config file read when present; `HRA_CONFIG` overrides the path
pub const DEFAULT_CONFIG_FILE: &str = "hra-server.toml";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the manifest and model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Prediction audit log; empty disables auditing
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,

    /// Retry column-mismatched invocations against the terminal estimator
    #[serde(default = "default_estimator_fallback")]
    pub estimator_fallback: bool,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_service_name() -> String {
    "hr-inference".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_manifest() -> String {
    "manifest.json".to_string()
}

fn default_audit_log_path() -> String {
    "predictions.log".to_string()
}

fn default_estimator_fallback() -> bool {
    true
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            host: default_host(),
            port: default_port(),
            model_dir: default_model_dir(),
            manifest: default_manifest(),
            audit_log_path: default_audit_log_path(),
            estimator_fallback: default_estimator_fallback(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the optional config file, then `HRA_*`
    /// environment variables
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("HRA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("HRA").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Audit log location, `None` when auditing is disabled
    pub fn audit_log(&self) -> Option<PathBuf> {
        let path = self.audit_log_path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}
