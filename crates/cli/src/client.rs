//! API client for the HR inference service

use anyhow::{Context, Result};
use reqwest::{multipart, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Non-success response, with the messages from the `detail` body
#[derive(Debug, Error)]
#[error("API error ({status}): {}", messages.join("; "))]
pub struct ApiError {
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ApiError {
    fn from_body(status: StatusCode, body: &str) -> Self {
        let messages = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: Value::Array(items),
            }) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Ok(ErrorBody {
                detail: Value::String(message),
            }) => vec![message],
            Ok(ErrorBody { detail }) => vec![detail.to_string()],
            Err(_) => vec![body.to_string()],
        };
        Self { status, messages }
    }
}

/// API client for the inference service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// GET a probe endpoint, whose body is meaningful on 503 as well
    pub async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse response");
        }
        parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        parse(response).await
    }

    /// Upload a CSV file as the multipart `file` field
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, file: &Path) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .context("Invalid content type")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;

        parse(response).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_body(status, &body).into());
    }

    response.json().await.context("Failed to parse response")
}

// API response types

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    detail: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttritionPrediction {
    #[serde(rename = "AttritionRisk")]
    pub attrition_risk: f64,
    #[serde(rename = "AttritionRiskProbability")]
    pub attrition_risk_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformancePrediction {
    #[serde(rename = "PerformanceRating")]
    pub performance_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPrediction {
    #[serde(rename = "RetentionRisk")]
    pub retention_risk: f64,
    #[serde(rename = "RetentionRiskProbability")]
    pub retention_risk_probability: f64,
}

/// One row of any bulk response; fields absent for a model stay `None`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRow {
    #[serde(rename = "EmployeeIndex")]
    pub employee_index: usize,
    #[serde(rename = "AttritionRisk", skip_serializing_if = "Option::is_none")]
    pub attrition_risk: Option<f64>,
    #[serde(rename = "AttritionRiskProbability", skip_serializing_if = "Option::is_none")]
    pub attrition_risk_probability: Option<f64>,
    #[serde(rename = "PerformanceRating", skip_serializing_if = "Option::is_none")]
    pub performance_rating: Option<f64>,
    #[serde(rename = "RetentionRisk", skip_serializing_if = "Option::is_none")]
    pub retention_risk: Option<f64>,
    #[serde(rename = "RetentionRiskProbability", skip_serializing_if = "Option::is_none")]
    pub retention_risk_probability: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub predictions: Vec<BulkRow>,
}
