//! Feature preprocessing: reshape validated records into a model's layout
//!
//! Produces exactly the contract's columns in declared order. Columns the
//! record lacks take the contract default; columns the contract does not
//! name are dropped. A row either transforms completely or the whole call
//! fails.

use crate::contract::FeatureContract;
use crate::error::PreprocessError;
use crate::models::{fields, EmployeeRecord, FeatureMatrix, FieldValue};

/// Fixed dictionary for binary category fields
fn fixed_encoding(column: &str) -> Option<&'static [(&'static str, f64)]> {
    match column {
        fields::OVER_TIME => Some(&[("Yes", 1.0), ("No", 0.0)]),
        fields::GENDER => Some(&[("Male", 1.0), ("Female", 0.0)]),
        _ => None,
    }
}

/// Reshapes records into feature matrices
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePreprocessor;

impl FeaturePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Encode one cell for `column`
    pub fn encode(
        &self,
        contract: &FeatureContract,
        column: &str,
        value: &FieldValue,
    ) -> Result<f64, PreprocessError> {
        match value {
            FieldValue::Missing => Ok(contract.default_for_column(column)),
            FieldValue::Number(n) => Ok(*n),
            FieldValue::Text(text) => {
                if let Some(dictionary) = fixed_encoding(column) {
                    return dictionary
                        .iter()
                        .find(|(label, _)| *label == text.as_str())
                        .map(|(_, code)| *code)
                        .ok_or_else(|| PreprocessError::UnencodableCategory {
                            column: column.to_string(),
                            value: text.clone(),
                        });
                }
                if let Some(levels) = contract.levels(column) {
                    return levels
                        .iter()
                        .position(|level| level == text)
                        .map(|idx| idx as f64)
                        .ok_or_else(|| PreprocessError::UnencodableCategory {
                            column: column.to_string(),
                            value: text.clone(),
                        });
                }
                value.as_number().ok_or_else(|| PreprocessError::NonNumeric {
                    column: column.to_string(),
                    value: text.clone(),
                })
            }
        }
    }

    /// Transform one record into a row in contract order
    pub fn transform_row(
        &self,
        record: &EmployeeRecord,
        contract: &FeatureContract,
    ) -> Result<Vec<f64>, PreprocessError> {
        contract
            .features()
            .iter()
            .map(|column| self.encode(contract, column, record.get(column)))
            .collect()
    }

    /// Transform a batch of records into one matrix
    pub fn transform<'a, I>(
        &self,
        records: I,
        contract: &FeatureContract,
    ) -> Result<FeatureMatrix, PreprocessError>
    where
        I: IntoIterator<Item = &'a EmployeeRecord>,
    {
        let expected = contract.expected_count();
        let mut rows = Vec::new();
        for (idx, record) in records.into_iter().enumerate() {
            let row = self.transform_row(record, contract)?;
            if row.len() != expected {
                return Err(PreprocessError::WidthMismatch {
                    row: idx,
                    expected,
                    actual: row.len(),
                });
            }
            rows.push(row);
        }
        Ok(FeatureMatrix::new(contract.features().to_vec(), rows))
    }
}
