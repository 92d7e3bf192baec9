//! Model invocation
//!
//! A model is a black box with a required point-estimate operation and an
//! optional probability operation. The probability capability is checked
//! once when a model is loaded, never per request.

mod invoker;
mod linear;
mod onnx;
mod pipeline;

pub use invoker::{LoadedModel, ModelInvoker, MAX_INFERENCE_MS};
pub use linear::{LinearModel, LinearTask};
pub use onnx::OnnxModel;
pub use pipeline::PipelineModel;

use crate::error::InferenceError;
use crate::models::FeatureMatrix;

/// Point-estimate capability every model provides
pub trait Model: Send + Sync {
    /// One predicted value (class label or continuous output) per row
    fn predict(&self, inputs: &FeatureMatrix) -> Result<Vec<f64>, InferenceError>;

    /// Probability capability, if the model has one
    fn as_probabilistic(&self) -> Option<&dyn ProbabilisticModel> {
        None
    }

    /// Final estimator of a multi-stage model, used by the degraded-mode
    /// fallback when the structured call rejects the column layout
    fn terminal_stage(&self) -> Option<&dyn Model> {
        None
    }

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Probability-distribution capability
pub trait ProbabilisticModel: Send + Sync {
    /// One distribution over classes per row
    fn predict_proba(&self, inputs: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError>;
}
