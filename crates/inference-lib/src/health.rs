//! Component health and readiness for the inference service
//!
//! The model registry and the audit log report here; `/healthz` and
//! `/readyz` read the aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but with reduced guarantees (no audit trail, failed smoke test)
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MODEL_REGISTRY: &str = "model_registry";
    pub const AUDIT_LOG: &str = "audit_log";
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    initialized: bool,
}

impl HealthState {
    /// Worst status across components; no components counts as healthy
    fn overall(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }

    fn first_unhealthy(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|(_, c)| c.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
    }
}

/// Shared view of component health, cloned into the HTTP state
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a component, starting healthy
    pub async fn register(&self, name: &str) {
        self.report(name, ComponentStatus::Healthy, None).await;
    }

    async fn report(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::new(status, message));
    }

    pub async fn set_healthy(&self, name: &str) {
        self.report(name, ComponentStatus::Healthy, None).await;
    }

    /// Degrade a component; an unhealthy component stays unhealthy until
    /// it is explicitly marked healthy
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        let mut state = self.state.write().await;
        let unhealthy = state
            .components
            .get(name)
            .is_some_and(|c| c.status == ComponentStatus::Unhealthy);
        if unhealthy {
            return;
        }
        state.components.insert(
            name.to_string(),
            ComponentHealth::new(ComponentStatus::Degraded, Some(message.into())),
        );
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.report(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// Flip once startup (model loading, smoke test) has finished
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.initialized = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state.components.clone(),
        }
    }

    /// Ready once initialized and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if !state.initialized {
            Some("Service not yet initialized".to_string())
        } else {
            state
                .first_unhealthy()
                .map(|name| format!("Component '{}' is unhealthy", name))
        };
        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn started() -> HealthRegistry {
        let registry = HealthRegistry::new();
        registry.register(components::MODEL_REGISTRY).await;
        registry.register(components::AUDIT_LOG).await;
        registry
    }

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let health = HealthRegistry::new().health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_worst_component_wins() {
        let registry = started().await;
        registry
            .set_degraded(components::AUDIT_LOG, "Auditing disabled by configuration")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .set_unhealthy(components::MODEL_REGISTRY, "No models declared in manifest")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        registry.set_healthy(components::MODEL_REGISTRY).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_not_ready_before_startup_completes() {
        let readiness = started().await.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Service not yet initialized"));
    }

    #[tokio::test]
    async fn test_degraded_component_keeps_service_ready() {
        let registry = started().await;
        registry.set_ready(true).await;
        registry
            .set_degraded(components::AUDIT_LOG, "Audit log disabled")
            .await;

        assert!(registry.readiness().await.ready);
        let health = registry.health().await;
        assert_eq!(
            health.components[components::AUDIT_LOG].message.as_deref(),
            Some("Audit log disabled")
        );
        assert!(health.components[components::MODEL_REGISTRY].message.is_none());
    }

    #[tokio::test]
    async fn test_unhealthy_component_named_in_reason() {
        let registry = started().await;
        registry.set_ready(true).await;
        registry
            .set_unhealthy(components::MODEL_REGISTRY, "Manifest unreadable")
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Component 'model_registry' is unhealthy")
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ComponentStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }

    #[tokio::test]
    async fn test_degrading_keeps_unhealthy_component_unready() {
        let registry = started().await;
        registry
            .set_unhealthy(components::MODEL_REGISTRY, "No models declared in manifest")
            .await;
        registry
            .set_degraded(components::MODEL_REGISTRY, "Startup prediction failed")
            .await;
        registry.set_ready(true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::MODEL_REGISTRY].message.as_deref(),
            Some("No models declared in manifest")
        );
        assert!(!registry.readiness().await.ready);

        registry.set_healthy(components::MODEL_REGISTRY).await;
        assert!(registry.readiness().await.ready);
    }
}
