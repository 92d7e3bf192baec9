//! HR inference server
//!
//! Loads the model manifest, opens the prediction audit log and serves the
//! attrition, performance and retention endpoints.

use anyhow::{Context, Result};
use hr_inference_server::{api, config::ServerConfig};
use inference_lib::{
    health::{components, HealthRegistry},
    observability::{InferenceMetrics, StructuredLogger},
    AuditLogger, InferenceEngine, ModelInvoker, ModelRegistry, PredictionService,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting hr-inference-server");

    let config = ServerConfig::load()?;
    info!(
        model_dir = %config.model_dir.display(),
        manifest = %config.manifest,
        estimator_fallback = config.estimator_fallback,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_REGISTRY).await;
    health_registry.register(components::AUDIT_LOG).await;

    let metrics = InferenceMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);

    let registry = ModelRegistry::load(&config.model_dir, &config.manifest)
        .with_context(|| format!("Failed to load models from {}", config.model_dir.display()))?;
    if registry.is_empty() {
        health_registry
            .set_unhealthy(components::MODEL_REGISTRY, "No models declared in manifest")
            .await;
    }

    let audit = match config.audit_log() {
        Some(path) => match AuditLogger::open(&path) {
            Ok(audit) => audit,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Audit log unavailable, predictions will not be audited");
                health_registry
                    .set_degraded(components::AUDIT_LOG, format!("Cannot open audit log: {}", e))
                    .await;
                AuditLogger::disabled()
            }
        },
        None => {
            health_registry
                .set_degraded(components::AUDIT_LOG, "Auditing disabled by configuration")
                .await;
            AuditLogger::disabled()
        }
    };

    let engine = InferenceEngine::new(
        Arc::new(registry),
        ModelInvoker::new(config.estimator_fallback),
    );
    let service = Arc::new(PredictionService::new(engine, audit, logger.clone()));
    logger.log_startup(SERVICE_VERSION, service.engine().registry().len());

    // A failing sample prediction degrades the service but does not stop it
    if !service.engine().registry().is_empty() {
        let smoke_service = service.clone();
        let smoke = tokio::task::spawn_blocking(move || smoke_service.smoke_test()).await?;
        if let Err(e) = smoke {
            health_registry
                .set_degraded(components::MODEL_REGISTRY, format!("Startup prediction failed: {}", e))
                .await;
        }
    }

    let app_state = Arc::new(api::AppState::new(
        service,
        health_registry.clone(),
        metrics,
        config.max_upload_bytes,
    ));

    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(config.bind_addr(), app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
