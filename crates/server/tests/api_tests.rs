//! Integration tests for the inference API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hr_inference_server::api::{create_router, AppState, UPLOAD_FIELD};
use inference_lib::{
    health::{components, HealthRegistry},
    observability::{InferenceMetrics, StructuredLogger},
    AuditLogger, FeatureContract, InferenceEngine, LinearModel, LoadedModel, ModelInvoker,
    ModelKind, ModelRegistry, PredictionService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "hra-test-boundary";

const HEADER: &str = "Age,Gender,Department,JobRole,MonthlyIncome,YearsAtCompany,OverTime,JobSatisfaction,WorkLifeBalance,TotalWorkingYears,TrainingTimesLastYear,JobInvolvement,EnvironmentSatisfaction,RelationshipSatisfaction";

fn performance_model() -> LinearModel {
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

fn test_registry() -> ModelRegistry {
    let models = [
        (
            ModelKind::Attrition,
            LinearModel::logistic(vec![-0.8, -0.6, 2.0], 1.5),
        ),
        (ModelKind::Performance, performance_model()),
        (
            ModelKind::Retention,
            LinearModel::logistic(vec![-0.5, -0.4, -0.3, 1.2, 0.1, -0.2], 2.0),
        ),
    ];
    models
        .into_iter()
        .fold(ModelRegistry::new(), |registry, (kind, model)| {
            registry.with_model(
                FeatureContract::default_for(kind),
                LoadedModel::new(kind, "test", Arc::new(model)),
            )
        })
}

/// Performance model that always predicts class 5, a rating of 6
fn out_of_scale_registry() -> ModelRegistry {
    let weights = (0..6).map(|_| vec![0.0; 14]).collect();
    let intercepts = (0..6).map(|k| if k == 5 { 10.0 } else { 0.0 }).collect();
    test_registry().with_model(
        FeatureContract::default_for(ModelKind::Performance),
        LoadedModel::new(
            ModelKind::Performance,
            "test",
            Arc::new(LinearModel::multinomial(weights, intercepts)),
        ),
    )
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app_with(test_registry()).await
}

async fn setup_app_with(registry: ModelRegistry) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_REGISTRY).await;
    health_registry.register(components::AUDIT_LOG).await;

    let engine = InferenceEngine::new(Arc::new(registry), ModelInvoker::new(true));
    let service = PredictionService::new(
        engine,
        AuditLogger::disabled(),
        StructuredLogger::new("api-tests"),
    );
    let state = Arc::new(AppState::new(
        Arc::new(service),
        health_registry,
        InferenceMetrics::new(),
        1024 * 1024,
    ));
    let router = create_router(state.clone());

    (router, state)
}

fn employee() -> Value {
    json!({
        "Age": 35, "Gender": "Male", "Department": "Sales", "JobRole": "Manager",
        "MonthlyIncome": 10000, "YearsAtCompany": 10, "OverTime": "No",
        "JobSatisfaction": 4, "WorkLifeBalance": 3, "TotalWorkingYears": 15,
        "TrainingTimesLastYear": 2, "JobInvolvement": 3,
        "EnvironmentSatisfaction": 4, "RelationshipSatisfaction": 2
    })
}

fn csv_row(overtime: &str) -> String {
    format!("35,Male,Sales,Manager,10000,10,{},4,3,15,2,3,4,2", overtime)
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(uri: &str, field: &str, csv: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"employees.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = field,
        csv = csv
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().starts_with("Welcome"));
    assert_eq!(body["endpoints"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_health_acknowledges() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_predict_attrition() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(json_request("/predict_attrition", &employee()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["AttritionRisk"], 0.0);
    let probability = body["AttritionRiskProbability"].as_f64().unwrap();
    assert!(probability > 0.0 && probability < 0.5);
}

#[tokio::test]
async fn test_predict_attrition_rejects_out_of_range_age() {
    let (app, _state) = setup_test_app().await;
    let mut input = employee();
    input["Age"] = json!(17);

    let response = app
        .oneshot(json_request("/predict_attrition", &input))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Age must be between 18 and 100."
    );
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _state) = setup_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/predict_performance")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid data format"));
}

#[tokio::test]
async fn test_predict_performance_is_one_based() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(json_request("/predict_performance", &employee()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rating = body["PerformanceRating"].as_f64().unwrap();
    assert!((1.0..=4.0).contains(&rating));
    assert_eq!(rating.fract(), 0.0);
}

#[tokio::test]
async fn test_retention_overwrites_supplied_rating() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("/predict_performance", &employee()))
        .await
        .unwrap();
    let rating = body_json(response).await["PerformanceRating"].clone();

    let direct = body_json(
        app.clone()
            .oneshot(json_request("/predict_retention", &employee()))
            .await
            .unwrap(),
    )
    .await;

    // A supplied rating is overwritten by the chained one
    let mut with_rating = employee();
    with_rating["PerformanceRating"] = json!(1);
    assert_ne!(rating, json!(1.0));
    let overridden = body_json(
        app.oneshot(json_request("/predict_retention", &with_rating))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(direct, overridden);
    assert!(direct["RetentionRiskProbability"].as_f64().unwrap() >= 0.5);
}

#[tokio::test]
async fn test_bulk_attrition() {
    let (app, _state) = setup_test_app().await;
    let csv = format!("{}\n{}\n{}\n{}", HEADER, csv_row("No"), csv_row("Yes"), csv_row("No"));

    let response = app
        .oneshot(upload_request("/predict_attrition_bulk", UPLOAD_FIELD, &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    for (idx, row) in predictions.iter().enumerate() {
        assert_eq!(row["EmployeeIndex"], idx);
        assert!(row["AttritionRiskProbability"].is_number());
    }
}

#[tokio::test]
async fn test_bulk_validation_errors_reference_rows() {
    let (app, _state) = setup_test_app().await;
    let mut rows: Vec<String> = (0..5).map(|_| csv_row("No")).collect();
    rows[3] = csv_row("Maybe");
    let csv = format!("{}\n{}", HEADER, rows.join("\n"));

    let response = app
        .oneshot(upload_request("/predict_performance_bulk", UPLOAD_FIELD, &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let detail = body["detail"].as_array().unwrap();
    assert_eq!(detail[0], "Row 3: OverTime must be 'Yes' or 'No'.");
}

#[tokio::test]
async fn test_bulk_missing_columns() {
    let (app, _state) = setup_test_app().await;
    let csv = "JobSatisfaction,WorkLifeBalance,OverTime\n4,3,No";

    let response = app
        .oneshot(upload_request("/predict_retention_bulk", UPLOAD_FIELD, csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let detail = body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(detail.starts_with("Missing required columns"));
    assert!(detail.contains("Age"));
}

#[tokio::test]
async fn test_bulk_retention_includes_rating() {
    let (app, _state) = setup_test_app().await;
    let csv = format!("{}\n{}\n{}", HEADER, csv_row("Yes"), csv_row("No"));

    let response = app
        .oneshot(upload_request("/predict_retention_bulk", UPLOAD_FIELD, &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    for row in predictions {
        let rating = row["PerformanceRating"].as_f64().unwrap();
        assert!((1.0..=5.0).contains(&rating));
        assert!(row["RetentionRisk"].is_number());
    }
}

#[tokio::test]
async fn test_bulk_retention_rejects_out_of_scale_rating() {
    let (app, _state) = setup_app_with(out_of_scale_registry()).await;
    let csv = format!("{}\n{}\n{}", HEADER, csv_row("Yes"), csv_row("No"));

    let response = app
        .oneshot(upload_request("/predict_retention_bulk", UPLOAD_FIELD, &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["detail"],
        json!([
            "Row 0: PerformanceRating must be between 1 and 5.",
            "Row 1: PerformanceRating must be between 1 and 5."
        ])
    );
}

#[tokio::test]
async fn test_retention_rejects_out_of_scale_rating() {
    let (app, _state) = setup_app_with(out_of_scale_registry()).await;

    let response = app
        .oneshot(json_request("/predict_retention", &employee()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "PerformanceRating must be between 1 and 5."
    );
}

#[tokio::test]
async fn test_bulk_without_file_field() {
    let (app, _state) = setup_test_app().await;
    let csv = format!("{}\n{}", HEADER, csv_row("No"));

    let response = app
        .oneshot(upload_request("/predict_attrition_bulk", "upload", &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_degraded(components::AUDIT_LOG, "Auditing disabled by configuration")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    // Degraded still returns 200 (operational)
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "degraded");
    assert!(health["components"]["model_registry"].is_object());
    assert!(health["components"]["audit_log"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::MODEL_REGISTRY, "No models declared in manifest")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/readyz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app().await;
    state.health_registry.set_ready(true).await;

    let response = app.oneshot(get("/readyz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app().await;

    // Serve one prediction so per-endpoint series exist
    let response = app
        .clone()
        .oneshot(json_request("/predict_attrition", &employee()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("hr_inference_predictions_total"));
    assert!(metrics_text.contains("hr_inference_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("hr_inference_prediction_latency_seconds_count"));
}
