//! HTTP API: prediction endpoints, health checks and Prometheus metrics

use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use inference_lib::{
    endpoints,
    health::{ComponentStatus, HealthRegistry},
    observability::InferenceMetrics,
    AttritionPrediction, BulkAttritionRow, BulkPerformanceRow, BulkResponse, BulkRetentionRow,
    PerformancePrediction, PipelineError, PredictionService, RetentionPrediction,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Multipart field carrying the CSV table
pub const UPLOAD_FIELD: &str = "file";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
    pub metrics: InferenceMetrics,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        health_registry: HealthRegistry,
        metrics: InferenceMetrics,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
            max_upload_bytes,
        }
    }
}

/// Error body: `{"detail": "..."}` or `{"detail": ["Row 3: ...", ...]}`
pub struct ApiError {
    status: StatusCode,
    detail: Value,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: Value::String(message.into()),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: Value::String(message.into()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let detail = match &err {
            PipelineError::InvalidBatch { .. } => json!(err.messages()),
            other => Value::String(other.to_string()),
        };
        Self { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a synchronous service call off the async executor
async fn run_blocking<T, F>(state: &AppState, call: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&PredictionService) -> Result<T, PipelineError> + Send + 'static,
{
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || call(&service)).await {
        Ok(result) => Ok(Json(result?)),
        Err(e) => {
            error!(error = %e, "Prediction task failed");
            Err(ApiError::internal(format!("Prediction task failed: {}", e)))
        }
    }
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(format!("Invalid data format: {}", rejection.body_text())))
}

/// Bytes of the `file` part of a multipart upload
async fn upload_bytes(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        ApiError::bad_request(format!("Invalid data format: {}", e.body_text()))
    };
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await.map_err(invalid)?.to_vec());
        }
    }
    Err(ApiError::bad_request(format!(
        "Missing upload field '{}'",
        UPLOAD_FIELD
    )))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the HR Analytics API (Attrition, Performance & Retention).",
        "endpoints": [
            endpoints::PREDICT_ATTRITION,
            endpoints::PREDICT_ATTRITION_BULK,
            endpoints::PREDICT_PERFORMANCE,
            endpoints::PREDICT_PERFORMANCE_BULK,
            endpoints::PREDICT_RETENTION,
            endpoints::PREDICT_RETENTION_BULK,
        ],
    }))
}

/// Liveness acknowledgement
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return ApiError::internal(format!("Failed to encode metrics: {}", e)).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn predict_attrition(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AttritionPrediction> {
    let input = json_body(body)?;
    run_blocking(&state, move |service| service.predict_attrition(&input)).await
}

async fn predict_performance(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<PerformancePrediction> {
    let input = json_body(body)?;
    run_blocking(&state, move |service| service.predict_performance(&input)).await
}

async fn predict_retention(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RetentionPrediction> {
    let input = json_body(body)?;
    run_blocking(&state, move |service| service.predict_retention(&input)).await
}

async fn predict_attrition_bulk(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<BulkResponse<BulkAttritionRow>> {
    let upload = upload_bytes(multipart).await?;
    run_blocking(&state, move |service| service.predict_attrition_bulk(&upload)).await
}

async fn predict_performance_bulk(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<BulkResponse<BulkPerformanceRow>> {
    let upload = upload_bytes(multipart).await?;
    run_blocking(&state, move |service| service.predict_performance_bulk(&upload)).await
}

async fn predict_retention_bulk(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<BulkResponse<BulkRetentionRow>> {
    let upload = upload_bytes(multipart).await?;
    run_blocking(&state, move |service| service.predict_retention_bulk(&upload)).await
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/predict_attrition", post(predict_attrition))
        .route("/predict_performance", post(predict_performance))
        .route("/predict_retention", post(predict_retention))
        .route("/predict_attrition_bulk", post(predict_attrition_bulk))
        .route("/predict_performance_bulk", post(predict_performance_bulk))
        .route("/predict_retention_bulk", post(predict_retention_bulk))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    addr: String,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
