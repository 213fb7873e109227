//! Integration tests for the prediction service API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use risk_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::{load_classifier, LogisticClassifier, ModelSettings},
    FeatureSchema,
};
use risk_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Constant model: every record scores sigmoid(1.2657) ~ 0.78
const CONSTANT_MODEL: &str = r#"{
    "coefficients": [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    "intercept": 1.2657,
    "version": "constant-0.78"
}"#;

fn canonical_body() -> Value {
    json!({
        "age": 45, "sex": 1, "cp": 2, "trestbps": 130, "chol": 250,
        "fbs": 0, "restecg": 1, "thalach": 165, "exang": 0,
        "oldpeak": 1.2, "slope": 1, "ca": 0, "thal": 2
    })
}

async fn base_state() -> AppState {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SCHEMA).await;
    health_registry.register(components::MODEL).await;

    AppState::new(
        health_registry,
        ServiceMetrics::new(),
        StructuredLogger::new("risk-server-test"),
        FeatureSchema::heart_disease(),
    )
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let classifier = LogisticClassifier::from_json(CONSTANT_MODEL.as_bytes()).unwrap();
    let state = Arc::new(base_state().await.with_classifier(Arc::new(classifier)));
    state.health_registry.set_ready(true).await;
    (create_router(state.clone()), state)
}

async fn setup_app_without_model() -> (Router, Arc<AppState>) {
    let err = load_classifier(&ModelSettings::new("/nonexistent/stack_model.onnx"))
        .err()
        .unwrap();
    let state = base_state().await.with_model_error(&err);
    state
        .health_registry
        .set_unhealthy(components::MODEL, err.to_string())
        .await;
    state.health_registry.set_ready(true).await;

    let state = Arc::new(state);
    (create_router(state.clone()), state)
}

async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_raw(app: Router, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_predict_returns_risk_report() {
    let (app, _state) = setup_test_app().await;

    let (status, report) = post_json(app, "/v1/predict", &canonical_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["label"], 1);
    assert_eq!(report["percentage"], 78);
    assert_eq!(
        report["message"],
        "High chance of Heart Disease (Confidence: 0.78)"
    );
    assert_eq!(report["gauge"]["label"], "Heart Disease Risk Level");
    assert_eq!(report["model_version"], "constant-0.78");
}

#[tokio::test]
async fn test_predict_missing_field_is_422() {
    let (app, _state) = setup_test_app().await;

    let mut body = canonical_body();
    body.as_object_mut().unwrap().remove("thal");
    let (status, error) = post_json(app, "/v1/predict", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "schema_mismatch");
    assert!(error["error"].as_str().unwrap().contains("thal"));
}

#[tokio::test]
async fn test_predict_out_of_domain_is_422() {
    let (app, _state) = setup_test_app().await;

    let mut body = canonical_body();
    body["age"] = json!(150);
    let (status, error) = post_json(app, "/v1/predict", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "schema_mismatch");
}

#[tokio::test]
async fn test_predict_non_numeric_and_extra_fields_are_422() {
    let (app, _state) = setup_test_app().await;

    let mut body = canonical_body();
    body["sex"] = json!("male");
    let (status, error) = post_json(app.clone(), "/v1/predict", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "schema_mismatch");

    let mut body = canonical_body();
    body["smoker"] = json!(1);
    let (status, error) = post_json(app, "/v1/predict", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "schema_mismatch");
}

#[tokio::test]
async fn test_predict_truncated_body_is_422() {
    let (app, _state) = setup_test_app().await;

    let (status, error) = post_raw(app, "/v1/predict", r#"{"age": 45,"#).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "schema_mismatch");
    assert!(!error["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_predict_array_body_is_422() {
    let (app, _state) = setup_test_app().await;

    let (status, error) = post_raw(app, "/v1/predict", "[45, 1, 2]").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "schema_mismatch");
}

#[tokio::test]
async fn test_predict_without_content_type_keeps_error_body() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/predict")
                .body(Body::from(canonical_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["kind"], "schema_mismatch");
}

#[tokio::test]
async fn test_predict_without_model_is_503() {
    let (app, _state) = setup_app_without_model().await;

    let (status, error) = post_json(app, "/v1/predict", &canonical_body()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["kind"], "model_unavailable");
}

#[tokio::test]
async fn test_readyz_reports_missing_model() {
    let (app, _state) = setup_app_without_model().await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
    assert!(readiness["reason"]
        .as_str()
        .unwrap()
        .starts_with("Unhealthy: model:"));
}

#[tokio::test]
async fn test_schema_lists_fields_in_order() {
    let (app, _state) = setup_test_app().await;

    let (status, schema) = get_json(app, "/v1/schema").await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = schema["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang",
            "oldpeak", "slope", "ca", "thal"
        ]
    );
    assert_eq!(schema["model_version"], "constant-0.78");
    assert!(schema["fields"][0].get("default").is_none());
}

#[tokio::test]
async fn test_schema_includes_defaults() {
    let classifier = LogisticClassifier::from_json(CONSTANT_MODEL.as_bytes()).unwrap();
    let defaults = [("age".to_string(), 54.0)].into_iter().collect();
    let state = base_state()
        .await
        .with_defaults(defaults)
        .with_classifier(Arc::new(classifier));
    let app = create_router(Arc::new(state));

    let (_, schema) = get_json(app, "/v1/schema").await;
    assert_eq!(schema["fields"][0]["default"], 54.0);
    assert!(schema["fields"][1].get("default").is_none());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_degraded(components::SCHEMA, "Form defaults unavailable")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let state = Arc::new(base_state().await);
    let app = create_router(state);

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, _state) = setup_test_app().await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_exposes_prediction_counters() {
    let (app, _state) = setup_test_app().await;

    let (status, _) = post_json(app.clone(), "/v1/predict", &canonical_body()).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("heart_risk_predictions_total"));
    assert!(text.contains("heart_risk_inference_latency_seconds"));
}
