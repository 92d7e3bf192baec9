//! Inference library for the HR analytics service
//!
//! This crate provides the core functionality for:
//! - Field validation and feature contracts
//! - Preprocessing records into model layouts
//! - Model invocation with chained performance -> retention resolution
//! - Batch uploads and prediction auditing
//! - Health checks and observability

pub mod audit;
pub mod batch;
pub mod chain;
pub mod contract;
pub mod engine;
pub mod error;
pub mod health;
pub mod inference;
pub mod models;
pub mod observability;
pub mod preprocess;
pub mod registry;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit::{AuditEntry, AuditLogger};
pub use contract::{ContractRegistry, FeatureContract};
pub use engine::InferenceEngine;
pub use error::{PipelineError, RegistryError, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use inference::{LinearModel, LoadedModel, ModelInvoker};
pub use models::*;
pub use observability::{InferenceMetrics, StructuredLogger};
pub use registry::ModelRegistry;
pub use service::PredictionService;
