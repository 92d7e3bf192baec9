//! Model registry: artifacts and their feature contracts
//!
//! Built once at startup from a JSON manifest, then shared read-only by
//! every request. Nothing here is mutated after construction.

use crate::contract::{ContractRegistry, FeatureContract};
use crate::error::RegistryError;
use crate::inference::{LinearModel, LoadedModel, Model, OnnxModel, PipelineModel};
use crate::models::ModelKind;
use crate::observability::{InferenceMetrics, StructuredLogger};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default manifest file name inside the model directory
pub const DEFAULT_MANIFEST: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Onnx,
    Linear,
}

/// One model as described by the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub name: ModelKind,
    #[serde(default = "default_version")]
    pub version: String,
    pub format: ArtifactFormat,
    pub artifact: String,
    #[serde(default)]
    pub sha256: Option<String>,
    /// Contract columns in order; empty means the built-in contract
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, f64>,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Column names the model was trained with, when it checks them itself
    #[serde(default)]
    pub pipeline_features: Option<Vec<String>>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

impl ManifestEntry {
    pub fn contract(&self) -> FeatureContract {
        let mut contract = if self.features.is_empty() {
            FeatureContract::default_for(self.name)
        } else {
            FeatureContract::new(self.name, self.features.clone())
        };
        if !self.defaults.is_empty() {
            contract = contract.with_defaults(self.defaults.clone());
        }
        if !self.categories.is_empty() {
            contract = contract.with_categories(self.categories.clone());
        }
        contract
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub models: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, RegistryError> {
        let manifest: Self =
            serde_json::from_slice(bytes).map_err(|e| RegistryError::Manifest(e.to_string()))?;
        let mut seen = Vec::new();
        for entry in &manifest.models {
            if seen.contains(&entry.name) {
                return Err(RegistryError::Manifest(format!(
                    "model {} declared more than once",
                    entry.name
                )));
            }
            seen.push(entry.name);
        }
        Ok(manifest)
    }
}

/// Loaded models and the contract registry, keyed by model
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    contracts: ContractRegistry,
    models: BTreeMap<ModelKind, LoadedModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model with its contract; used at startup and by tests
    pub fn with_model(mut self, contract: FeatureContract, model: LoadedModel) -> Self {
        self.models.insert(contract.model(), model);
        self.contracts.insert(contract);
        self
    }

    /// Load every model named in `model_dir/manifest`
    pub fn load(model_dir: impl AsRef<Path>, manifest: &str) -> Result<Self, RegistryError> {
        let model_dir = model_dir.as_ref();
        let manifest_path = model_dir.join(manifest);
        let bytes = read(&manifest_path)?;
        let manifest = Manifest::parse(&bytes)?;
        info!(path = %manifest_path.display(), models = manifest.models.len(), "Loading model manifest");

        let logger = StructuredLogger::new("model-registry");
        let metrics = InferenceMetrics::new();
        let mut registry = Self::new();
        for entry in &manifest.models {
            let contract = entry.contract();
            let model = load_entry(model_dir, entry, contract.expected_count())?;
            logger.log_model_loaded(
                entry.name.as_str(),
                &entry.version,
                &model.describe(),
                contract.features(),
                model.supports_probabilities(),
            );
            metrics.set_model_info(
                entry.name.as_str(),
                &entry.version,
                model.supports_probabilities(),
            );
            registry = registry.with_model(contract, model);
        }

        for kind in ModelKind::ALL {
            if !registry.models.contains_key(&kind) {
                warn!(model = %kind, "No artifact declared; endpoints using it will fail");
            }
        }
        Ok(registry)
    }

    pub fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    /// Contract and model for `kind`
    pub fn get(&self, kind: ModelKind) -> Result<(&FeatureContract, &LoadedModel), RegistryError> {
        match (self.contracts.get(kind), self.models.get(&kind)) {
            (Some(contract), Some(model)) => Ok((contract, model)),
            _ => Err(RegistryError::MissingModel(kind.to_string())),
        }
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.models.contains_key(&kind)
    }

    pub fn loaded(&self) -> impl Iterator<Item = &LoadedModel> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, RegistryError> {
    fs::read(path).map_err(|source| RegistryError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn load_entry(
    model_dir: &Path,
    entry: &ManifestEntry,
    num_features: usize,
) -> Result<LoadedModel, RegistryError> {
    let path: PathBuf = model_dir.join(&entry.artifact);
    let bytes = read(&path)?;

    if let Some(expected) = &entry.sha256 {
        verify_checksum(&entry.artifact, &bytes, expected)?;
    }

    let artifact_error = |reason: String| RegistryError::Artifact {
        artifact: entry.artifact.clone(),
        reason,
    };

    let input_width = entry
        .pipeline_features
        .as_ref()
        .map(Vec::len)
        .unwrap_or(num_features);

    let estimator: Box<dyn Model> = match entry.format {
        ArtifactFormat::Linear => Box::new(LinearModel::from_json(&bytes).map_err(artifact_error)?),
        ArtifactFormat::Onnx => Box::new(
            OnnxModel::from_bytes(&bytes, input_width).map_err(|e| artifact_error(format!("{:#}", e)))?,
        ),
    };

    let model: Arc<dyn Model> = match &entry.pipeline_features {
        Some(features) => {
            debug!(model = %entry.name, ?features, "Wrapping artifact in column-checking pipeline");
            Arc::new(PipelineModel::new(features.clone(), estimator))
        }
        None => Arc::from(estimator),
    };

    Ok(LoadedModel::new(entry.name, entry.version.clone(), model))
}

/// Compare the artifact's SHA-256 with the manifest value (hex, any case)
pub fn verify_checksum(artifact: &str, bytes: &[u8], expected: &str) -> Result<(), RegistryError> {
    let actual = hex::encode(Sha256::digest(bytes));
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(RegistryError::Checksum {
            artifact: artifact.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
