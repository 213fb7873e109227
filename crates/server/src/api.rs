//! HTTP API for predictions, schema inspection, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use risk_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    Classifier, FeatureSchema, FieldDomain, InferenceAdapter, PatientRecord, PredictError,
    RiskReport,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Classifier state as seen by request handlers
#[derive(Clone)]
enum ModelState {
    Ready(InferenceAdapter),
    Unavailable(String),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    schema: FeatureSchema,
    defaults: BTreeMap<String, f64>,
    model: ModelState,
}

impl AppState {
    /// State with no classifier; predictions answer 503 until one is attached
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        schema: FeatureSchema,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            schema,
            defaults: BTreeMap::new(),
            model: ModelState::Unavailable("model not loaded".to_string()),
        }
    }

    pub fn with_defaults(mut self, defaults: BTreeMap<String, f64>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        let adapter = InferenceAdapter::new(self.schema.clone(), classifier);
        self.model = ModelState::Ready(adapter);
        self
    }

    pub fn with_model_error(mut self, err: &PredictError) -> Self {
        self.model = ModelState::Unavailable(err.to_string());
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

/// Error body returned by the prediction endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

/// One entry of the `/v1/schema` response, in classifier order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub label: String,
    pub domain: FieldDomain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub fields: Vec<SchemaField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

fn status_for(err: &PredictError) -> StatusCode {
    match err {
        PredictError::SchemaMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictError::ModelUnavailable { .. } | PredictError::SchemaUnavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PredictError::InferenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, kind: &str, message: String) -> Response {
    let body = ErrorBody {
        error: message,
        kind: kind.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Score one patient record
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Map<String, serde_json::Value>>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let status = match &rejection {
                JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let message = rejection.body_text();
            state.metrics.inc_prediction_errors("schema_mismatch");
            state
                .logger
                .log_prediction_failed("schema_mismatch", &message);
            return error_response(status, "schema_mismatch", message);
        }
    };

    let adapter = match &state.model {
        ModelState::Ready(adapter) => adapter,
        ModelState::Unavailable(reason) => {
            state.metrics.inc_prediction_errors("model_unavailable");
            state
                .logger
                .log_prediction_failed("model_unavailable", reason);
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "model_unavailable",
                reason.clone(),
            );
        }
    };

    let start = Instant::now();
    let outcome = PatientRecord::from_json(&body)
        .map_err(PredictError::from)
        .and_then(|record| adapter.predict(&record));
    state
        .metrics
        .observe_inference_latency(start.elapsed().as_secs_f64());

    match outcome {
        Ok(result) => {
            let report = RiskReport::new(&result, adapter.model_version());
            state.metrics.inc_predictions(report.label);
            state.logger.log_prediction(
                report.label,
                report.probability,
                report.percentage,
                &report.model_version,
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(err) => {
            state.metrics.inc_prediction_errors(err.kind());
            state
                .logger
                .log_prediction_failed(err.kind(), &err.to_string());
            error_response(status_for(&err), err.kind(), err.to_string())
        }
    }
}

/// Ordered schema with domains and form defaults
async fn schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fields = state
        .schema
        .fields()
        .iter()
        .map(|spec| SchemaField {
            name: spec.name.clone(),
            label: spec.label.clone(),
            domain: spec.domain.clone(),
            default: state.defaults.get(&spec.name).copied(),
        })
        .collect();

    let model_version = match &state.model {
        ModelState::Ready(adapter) => Some(adapter.model_version().to_string()),
        ModelState::Unavailable(_) => None,
    };

    Json(SchemaResponse {
        fields,
        model_version,
    })
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
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict", post(predict))
        .route("/v1/schema", get(schema))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
