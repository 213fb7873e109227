//! Heart risk server - patient record in, disease risk out
//!
//! Loads the feature schema and the classifier once at startup and serves
//! predictions over HTTP. A missing model keeps the service up but not ready.

use anyhow::{Context, Result};
use risk_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    ClassifierCache,
};
use risk_server::{api, config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "risk-server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting risk-server");

    let config = config::ServerConfig::load()?;
    info!(api_port = config.api_port, model = ?config.model.path, "Server configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::SCHEMA).await;
    health_registry.register(components::MODEL).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    // Schema
    let provider = config.schema.provider();
    let schema = provider
        .load_schema()
        .context("Failed to load feature schema")?;
    metrics.set_schema_features(schema.len());

    let defaults = match provider.load_defaults(&schema) {
        Ok(defaults) => defaults,
        Err(e) => {
            warn!(error = %e, "Form defaults unavailable");
            health_registry
                .set_degraded(components::SCHEMA, e.to_string())
                .await;
            Default::default()
        }
    };

    let mut state =
        api::AppState::new(health_registry.clone(), metrics.clone(), logger.clone(), schema)
            .with_defaults(defaults);

    // Classifier
    match ClassifierCache::global().get_or_load(&config.model) {
        Ok(classifier) => {
            logger.log_model_loaded(
                &config.model.path,
                classifier.version(),
                classifier.input_width(),
            );
            metrics.set_model_version(classifier.version());
            state = state.with_classifier(classifier);
        }
        Err(e) => {
            logger.log_model_load_failed(&config.model.path, &e.to_string());
            health_registry
                .set_unhealthy(components::MODEL, e.to_string())
                .await;
            state = state.with_model_error(&e);
        }
    }

    logger.log_startup(SERVER_VERSION, state.schema().len());
    health_registry.set_ready(true).await;

    let app_state = Arc::new(state);
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            served.context("API server task panicked")??;
            logger.log_shutdown("API server stopped");
        }
    }

    info!("Shutting down");
    Ok(())
}
