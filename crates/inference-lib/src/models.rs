//! Core data models for the inference service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Field names shared by the request schemas
pub mod fields {
    pub const AGE: &str = "Age";
    pub const GENDER: &str = "Gender";
    pub const DEPARTMENT: &str = "Department";
    pub const JOB_ROLE: &str = "JobRole";
    pub const MONTHLY_INCOME: &str = "MonthlyIncome";
    pub const YEARS_AT_COMPANY: &str = "YearsAtCompany";
    pub const OVER_TIME: &str = "OverTime";
    pub const JOB_SATISFACTION: &str = "JobSatisfaction";
    pub const WORK_LIFE_BALANCE: &str = "WorkLifeBalance";
    pub const TOTAL_WORKING_YEARS: &str = "TotalWorkingYears";
    pub const TRAINING_TIMES_LAST_YEAR: &str = "TrainingTimesLastYear";
    pub const JOB_INVOLVEMENT: &str = "JobInvolvement";
    pub const ENVIRONMENT_SATISFACTION: &str = "EnvironmentSatisfaction";
    pub const RELATIONSHIP_SATISFACTION: &str = "RelationshipSatisfaction";
    pub const PERFORMANCE_RATING: &str = "PerformanceRating";

    /// The 14 fields every employee record carries
    pub const EMPLOYEE_FIELDS: [&str; 14] = [
        AGE,
        GENDER,
        DEPARTMENT,
        JOB_ROLE,
        MONTHLY_INCOME,
        YEARS_AT_COMPANY,
        OVER_TIME,
        JOB_SATISFACTION,
        WORK_LIFE_BALANCE,
        TOTAL_WORKING_YEARS,
        TRAINING_TIMES_LAST_YEAR,
        JOB_INVOLVEMENT,
        ENVIRONMENT_SATISFACTION,
        RELATIONSHIP_SATISFACTION,
    ];

    /// Fields the retention model consumes, including the chained rating
    pub const RETENTION_FIELDS: [&str; 6] = [
        JOB_SATISFACTION,
        WORK_LIFE_BALANCE,
        JOB_INVOLVEMENT,
        OVER_TIME,
        GENDER,
        PERFORMANCE_RATING,
    ];
}

/// A single field value of an employee record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Numeric view of the value; numeric strings are accepted
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Missing => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Parse a raw CSV cell: empty is missing, numeric text is a number
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return FieldValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => FieldValue::Number(n),
            Err(_) => FieldValue::Text(trimmed.to_string()),
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Missing,
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Missing),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Bool(b) => FieldValue::Text(b.to_string()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Missing => Value::Null,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One subject: field name to value. Preprocessing derives new records, it
/// never mutates one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl EmployeeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly used by tests and the chain resolver
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&FieldValue::Missing)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Copy of this record restricted to `names`; absent names stay absent
    pub fn project(&self, names: &[&str]) -> Self {
        let fields = names
            .iter()
            .filter_map(|name| {
                self.fields
                    .get(*name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();
        Self { fields }
    }

    /// Copy of this record with one extra (or replaced) field
    pub fn derive_with(&self, name: &str, value: FieldValue) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(name.to_string(), value);
        Self { fields }
    }

    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let fields = map
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect();
        Self { fields }
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

/// Reshaped numeric input for one model, columns in contract order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { columns, rows }
    }

    /// Raw numeric array without column identities
    pub fn anonymous(&self) -> Self {
        Self {
            columns: Vec::new(),
            rows: self.rows.clone(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the matrix, taken from the data when columns are anonymous
    pub fn n_cols(&self) -> usize {
        if self.columns.is_empty() {
            self.rows.first().map(Vec::len).unwrap_or(0)
        } else {
            self.columns.len()
        }
    }

    pub fn is_named(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Output of one model for one row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub value: f64,
    pub probabilities: Option<Vec<f64>>,
}

impl PredictionResult {
    /// Probability of a given class index, 0.0 when unavailable
    pub fn probability_of(&self, class_index: usize) -> f64 {
        self.probabilities
            .as_ref()
            .and_then(|p| p.get(class_index).copied())
            .unwrap_or(0.0)
    }

    /// Probability of the predicted class, 0.0 when unavailable
    pub fn probability_of_predicted(&self) -> f64 {
        if self.value < 0.0 {
            return 0.0;
        }
        self.probability_of(self.value.round() as usize)
    }
}

/// The three models served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Attrition,
    Performance,
    Retention,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Attrition,
        ModelKind::Performance,
        ModelKind::Retention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Attrition => "attrition",
            ModelKind::Performance => "performance",
            ModelKind::Retention => "retention",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint identifiers, used for audit entries and metric labels
pub mod endpoints {
    pub const PREDICT_ATTRITION: &str = "predict_attrition";
    pub const PREDICT_ATTRITION_BULK: &str = "predict_attrition_bulk";
    pub const PREDICT_PERFORMANCE: &str = "predict_performance";
    pub const PREDICT_PERFORMANCE_BULK: &str = "predict_performance_bulk";
    pub const PREDICT_RETENTION: &str = "predict_retention";
    pub const PREDICT_RETENTION_BULK: &str = "predict_retention_bulk";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttritionPrediction {
    #[serde(rename = "AttritionRisk")]
    pub attrition_risk: f64,
    #[serde(rename = "AttritionRiskProbability")]
    pub attrition_risk_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    #[serde(rename = "PerformanceRating")]
    pub performance_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPrediction {
    #[serde(rename = "RetentionRisk")]
    pub retention_risk: f64,
    #[serde(rename = "RetentionRiskProbability")]
    pub retention_risk_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkAttritionRow {
    #[serde(rename = "EmployeeIndex")]
    pub employee_index: usize,
    #[serde(flatten)]
    pub prediction: AttritionPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkPerformanceRow {
    #[serde(rename = "EmployeeIndex")]
    pub employee_index: usize,
    #[serde(flatten)]
    pub prediction: PerformancePrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRetentionRow {
    #[serde(rename = "EmployeeIndex")]
    pub employee_index: usize,
    #[serde(flatten)]
    pub prediction: RetentionPrediction,
    #[serde(rename = "PerformanceRating")]
    pub performance_rating: f64,
}

/// Body of every bulk endpoint: one entry per input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse<T> {
    pub predictions: Vec<T>,
}
