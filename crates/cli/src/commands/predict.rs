//! Prediction CLI commands

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::path::Path;
use tabled::Tabled;

use super::ModelKind;
use crate::client::{
    ApiClient, AttritionPrediction, BulkResponse, BulkRow, PerformancePrediction,
    RetentionPrediction,
};
use crate::output::{color_risk, format_probability, print_info, print_json, print_table, OutputFormat};

/// Row for bulk prediction tables
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Employee")]
    index: usize,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Rating")]
    rating: String,
}

impl PredictionRow {
    fn from_bulk(kind: ModelKind, row: &BulkRow) -> Self {
        let (risk, probability) = match kind {
            ModelKind::Attrition => (row.attrition_risk, row.attrition_risk_probability),
            ModelKind::Retention => (row.retention_risk, row.retention_risk_probability),
            ModelKind::Performance => (None, None),
        };
        Self {
            index: row.employee_index,
            risk: risk.map(color_risk).unwrap_or_else(|| "-".to_string()),
            probability: probability
                .map(format_probability)
                .unwrap_or_else(|| "-".to_string()),
            rating: row
                .performance_rating
                .map(|r| format!("{:.0}", r))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Score one employee read from a JSON file
pub async fn predict_single(
    client: &ApiClient,
    kind: ModelKind,
    input: &Path,
    format: OutputFormat,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let record: Value = serde_json::from_str(&content).context("Input is not valid JSON")?;
    let path = kind.single_path();

    match kind {
        ModelKind::Attrition => {
            let result: AttritionPrediction = client.post(path, &record).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table => {
                    println!("{}", "Attrition".bold());
                    println!("Risk:        {}", color_risk(result.attrition_risk));
                    println!(
                        "Probability: {}",
                        format_probability(result.attrition_risk_probability)
                    );
                }
            }
        }
        ModelKind::Performance => {
            let result: PerformancePrediction = client.post(path, &record).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table => {
                    println!("{}", "Performance".bold());
                    println!("Rating: {}", format!("{:.0}", result.performance_rating).cyan());
                }
            }
        }
        ModelKind::Retention => {
            let result: RetentionPrediction = client.post(path, &record).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table => {
                    println!("{}", "Retention".bold());
                    println!("Risk:        {}", color_risk(result.retention_risk));
                    println!(
                        "Probability: {}",
                        format_probability(result.retention_risk_probability)
                    );
                }
            }
        }
    }

    Ok(())
}

/// Upload a CSV file and show one row per employee
pub async fn predict_bulk(
    client: &ApiClient,
    kind: ModelKind,
    file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let result: BulkResponse = client.upload(kind.bulk_path(), file).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows: Vec<PredictionRow> = result
                .predictions
                .iter()
                .map(|row| PredictionRow::from_bulk(kind, row))
                .collect();
            print_table(&rows);

            let flagged = rows_at_risk(kind, &result.predictions);
            print_info(&format!(
                "Total: {} employees{}",
                result.predictions.len(),
                flagged
                    .map(|n| format!(", {} at risk", n))
                    .unwrap_or_default()
            ));
        }
    }

    Ok(())
}

fn rows_at_risk(kind: ModelKind, rows: &[BulkRow]) -> Option<usize> {
    let risk = |row: &BulkRow| match kind {
        ModelKind::Attrition => row.attrition_risk,
        ModelKind::Retention => row.retention_risk,
        ModelKind::Performance => None,
    };
    match kind {
        ModelKind::Performance => None,
        _ => Some(rows.iter().filter(|r| risk(r).unwrap_or(0.0) >= 1.0).count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, risk: f64, rating: f64) -> BulkRow {
        BulkRow {
            employee_index: index,
            attrition_risk: None,
            attrition_risk_probability: None,
            performance_rating: Some(rating),
            retention_risk: Some(risk),
            retention_risk_probability: Some(0.5),
        }
    }

    #[test]
    fn test_rows_at_risk() {
        let rows = vec![row(0, 1.0, 3.0), row(1, 0.0, 4.0), row(2, 1.0, 2.0)];
        assert_eq!(rows_at_risk(ModelKind::Retention, &rows), Some(2));
        assert_eq!(rows_at_risk(ModelKind::Attrition, &rows), Some(0));
        assert_eq!(rows_at_risk(ModelKind::Performance, &rows), None);
    }

    #[test]
    fn test_performance_row_shows_rating_only() {
        let shown = PredictionRow::from_bulk(ModelKind::Performance, &row(5, 1.0, 3.0));
        assert_eq!(shown.index, 5);
        assert_eq!(shown.risk, "-");
        assert_eq!(shown.rating, "3");
    }
}
