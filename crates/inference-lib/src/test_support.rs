//! Fixtures shared by unit tests

use crate::contract::FeatureContract;
use crate::inference::{LinearModel, LoadedModel, ModelInvoker};
use crate::engine::InferenceEngine;
use crate::models::{EmployeeRecord, ModelKind};
use crate::registry::ModelRegistry;
use std::sync::Arc;

pub(crate) fn valid_employee() -> EmployeeRecord {
    EmployeeRecord::new()
        .with("Age", 35.0)
        .with("Gender", "Male")
        .with("Department", "Sales")
        .with("JobRole", "Manager")
        .with("MonthlyIncome", 10000.0)
        .with("YearsAtCompany", 10.0)
        .with("OverTime", "No")
        .with("JobSatisfaction", 4.0)
        .with("WorkLifeBalance", 3.0)
        .with("TotalWorkingYears", 15.0)
        .with("TrainingTimesLastYear", 2.0)
        .with("JobInvolvement", 3.0)
        .with("EnvironmentSatisfaction", 4.0)
        .with("RelationshipSatisfaction", 2.0)
}

/// Logistic model over [JobSatisfaction, WorkLifeBalance, OverTime]
pub(crate) fn attrition_model() -> LinearModel {
    LinearModel::logistic(vec![-0.8, -0.6, 2.0], 1.5)
}

/// Four-class model over the 14 employee fields, driven by
/// JobSatisfaction (column 7) and JobInvolvement (column 11)
pub(crate) fn performance_model() -> LinearModel {
    let weights = (0..4)
        .map(|k| {
            let mut row = vec![0.0; 14];
            row[7] = 0.3 * k as f64;
            row[11] = 0.4 * k as f64;
            row
        })
        .collect();
    let intercepts = (0..4).map(|k| -0.35 * (k * k) as f64).collect();
    LinearModel::multinomial(weights, intercepts)
}

/// Logistic model over the six retention columns
pub(crate) fn retention_model() -> LinearModel {
    LinearModel::logistic(vec![-0.5, -0.4, -0.3, 1.2, 0.1, -0.2], 2.0)
}

pub(crate) fn linear_registry() -> ModelRegistry {
    let entries: [(ModelKind, LinearModel); 3] = [
        (ModelKind::Attrition, attrition_model()),
        (ModelKind::Performance, performance_model()),
        (ModelKind::Retention, retention_model()),
    ];
    entries
        .into_iter()
        .fold(ModelRegistry::new(), |registry, (kind, model)| {
            registry.with_model(
                FeatureContract::default_for(kind),
                LoadedModel::new(kind, "test", Arc::new(model)),
            )
        })
}

pub(crate) fn linear_engine() -> InferenceEngine {
    InferenceEngine::new(Arc::new(linear_registry()), ModelInvoker::new(true))
}

/// Six-class performance model that always predicts class 5, i.e. a
/// rating of 6, outside the retention model's accepted scale
pub(crate) fn out_of_scale_performance_model() -> LinearModel {
    let weights = (0..6).map(|_| vec![0.0; 14]).collect();
    let intercepts = (0..6).map(|k| if k == 5 { 10.0 } else { 0.0 }).collect();
    LinearModel::multinomial(weights, intercepts)
}

pub(crate) fn out_of_scale_engine() -> InferenceEngine {
    let registry = linear_registry().with_model(
        FeatureContract::default_for(ModelKind::Performance),
        LoadedModel::new(
            ModelKind::Performance,
            "test",
            Arc::new(out_of_scale_performance_model()),
        ),
    );
    InferenceEngine::new(Arc::new(registry), ModelInvoker::new(true))
}
