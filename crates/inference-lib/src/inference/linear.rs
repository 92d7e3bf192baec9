//! Linear and logistic models stored as JSON coefficients
//!
//! Lets a deployment ship simple models without a native runtime. Binary
//! classifiers use one weight row and a sigmoid, multinomial classifiers one
//! row per class and a softmax, regressors a single row.

use super::{Model, ProbabilisticModel};
use crate::error::InferenceError;
use crate::models::FeatureMatrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearTask {
    #[default]
    Classification,
    Regression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    task: LinearTask,
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    #[serde(default)]
    classes: Vec<f64>,
}

impl LinearModel {
    /// Binary logistic classifier over classes {0, 1}
    pub fn logistic(weights: Vec<f64>, intercept: f64) -> Self {
        Self {
            task: LinearTask::Classification,
            weights: vec![weights],
            intercepts: vec![intercept],
            classes: vec![0.0, 1.0],
        }
    }

    /// Multinomial classifier; class `i` is labelled `i`
    pub fn multinomial(weights: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Self {
        let classes = (0..weights.len()).map(|i| i as f64).collect();
        Self {
            task: LinearTask::Classification,
            weights,
            intercepts,
            classes,
        }
    }

    pub fn regression(weights: Vec<f64>, intercept: f64) -> Self {
        Self {
            task: LinearTask::Regression,
            weights: vec![weights],
            intercepts: vec![intercept],
            classes: Vec::new(),
        }
    }

    /// Parse and check a JSON artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let mut model: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if model.task == LinearTask::Classification && model.classes.is_empty() {
            model.classes = if model.weights.len() == 1 {
                vec![0.0, 1.0]
            } else {
                (0..model.weights.len()).map(|i| i as f64).collect()
            };
        }
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("model has no weights".to_string());
        }
        if self.weights.len() != self.intercepts.len() {
            return Err(format!(
                "{} weight rows but {} intercepts",
                self.weights.len(),
                self.intercepts.len()
            ));
        }
        let width = self.width();
        if self.weights.iter().any(|row| row.len() != width) {
            return Err("weight rows have different widths".to_string());
        }
        match self.task {
            LinearTask::Regression if self.weights.len() != 1 => {
                Err("regression expects exactly one weight row".to_string())
            }
            LinearTask::Classification if self.weights.len() == 1 && self.classes.len() != 2 => {
                Err("binary classifier expects exactly two classes".to_string())
            }
            LinearTask::Classification
                if self.weights.len() > 1 && self.weights.len() != self.classes.len() =>
            {
                Err("multinomial classifier expects one weight row per class".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn width(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn check_width(&self, inputs: &FeatureMatrix) -> Result<(), InferenceError> {
        let actual = inputs.n_cols();
        if inputs.n_rows() > 0 && actual != self.width() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.width(),
                actual,
            });
        }
        Ok(())
    }

    fn scores(&self, row: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    fn distribution(&self, row: &[f64]) -> Vec<f64> {
        let scores = self.scores(row);
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return vec![1.0 - p, p];
        }
        softmax(&scores)
    }
}

impl Model for LinearModel {
    fn predict(&self, inputs: &FeatureMatrix) -> Result<Vec<f64>, InferenceError> {
        self.check_width(inputs)?;
        let values = inputs
            .rows()
            .iter()
            .map(|row| match self.task {
                LinearTask::Regression => self.scores(row)[0],
                LinearTask::Classification => {
                    let dist = self.distribution(row);
                    self.classes[argmax(&dist)]
                }
            })
            .collect();
        Ok(values)
    }

    fn as_probabilistic(&self) -> Option<&dyn ProbabilisticModel> {
        match self.task {
            LinearTask::Classification => Some(self),
            LinearTask::Regression => None,
        }
    }

    fn describe(&self) -> String {
        format!(
            "linear({:?}, {} inputs, {} outputs)",
            self.task,
            self.width(),
            self.weights.len()
        )
    }
}

impl ProbabilisticModel for LinearModel {
    fn predict_proba(&self, inputs: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
        self.check_width(inputs)?;
        Ok(inputs.rows().iter().map(|row| self.distribution(row)).collect())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties go to the lowest index
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
