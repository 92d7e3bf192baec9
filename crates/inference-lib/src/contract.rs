//! Feature contracts: the exact ordered column layout each model expects

use crate::models::{fields, ModelKind};
use std::collections::BTreeMap;

/// Default fill value for columns a record does not provide
pub const DEFAULT_FILL: f64 = 0.0;

/// Ordered feature list, per-column defaults and declared categorical levels
/// for one model. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContract {
    model: ModelKind,
    features: Vec<String>,
    defaults: BTreeMap<String, f64>,
    categories: BTreeMap<String, Vec<String>>,
}

impl FeatureContract {
    pub fn new(model: ModelKind, features: Vec<String>) -> Self {
        Self {
            model,
            features,
            defaults: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: BTreeMap<String, f64>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Declare ordinal levels for a categorical column (level index is the code)
    pub fn with_categories(mut self, categories: BTreeMap<String, Vec<String>>) -> Self {
        self.categories = categories;
        self
    }

    /// Built-in contract used when the manifest does not declare features
    pub fn default_for(model: ModelKind) -> Self {
        let features: Vec<String> = match model {
            ModelKind::Attrition => vec![
                fields::JOB_SATISFACTION,
                fields::WORK_LIFE_BALANCE,
                fields::OVER_TIME,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ModelKind::Performance => fields::EMPLOYEE_FIELDS.iter().map(|f| f.to_string()).collect(),
            ModelKind::Retention => fields::RETENTION_FIELDS.iter().map(|f| f.to_string()).collect(),
        };
        let contract = Self::new(model, features);
        match model {
            ModelKind::Performance => contract.with_categories(default_levels()),
            _ => contract,
        }
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn expected_count(&self) -> usize {
        self.features.len()
    }

    pub fn default_for_column(&self, column: &str) -> f64 {
        self.defaults.get(column).copied().unwrap_or(DEFAULT_FILL)
    }

    pub fn levels(&self, column: &str) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }
}

/// Levels of the free-text employee categories, in training order
pub const DEPARTMENT_LEVELS: &[&str] = &["Human Resources", "Research & Development", "Sales"];

pub const JOB_ROLE_LEVELS: &[&str] = &[
    "Healthcare Representative",
    "Human Resources",
    "Laboratory Technician",
    "Manager",
    "Manufacturing Director",
    "Research Director",
    "Research Scientist",
    "Sales Executive",
    "Sales Representative",
];

fn default_levels() -> BTreeMap<String, Vec<String>> {
    let to_owned = |levels: &[&str]| levels.iter().map(|l| l.to_string()).collect::<Vec<_>>();
    let mut categories = BTreeMap::new();
    categories.insert(fields::DEPARTMENT.to_string(), to_owned(DEPARTMENT_LEVELS));
    categories.insert(fields::JOB_ROLE.to_string(), to_owned(JOB_ROLE_LEVELS));
    categories
}

/// Contracts of every loaded model, keyed by model
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: BTreeMap<ModelKind, FeatureContract>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in contract of every model
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ModelKind::ALL {
            registry.insert(FeatureContract::default_for(kind));
        }
        registry
    }

    pub fn insert(&mut self, contract: FeatureContract) {
        self.contracts.insert(contract.model(), contract);
    }

    pub fn get(&self, model: ModelKind) -> Option<&FeatureContract> {
        self.contracts.get(&model)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
