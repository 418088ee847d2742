//! Optional export of request spans to a managed monitoring backend.
//!
//! The backend is described by a connection string of `Key=Value` pairs separated
//! by `;`, e.g. `InstrumentationKey=...;IngestionEndpoint=https://...`. Spans are
//! shipped over OTLP/HTTP to the ingestion endpoint, authenticated with the key.
//! Nothing here is ever fatal: the app keeps serving without telemetry.

use std::collections::HashMap;

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Tracer;
use opentelemetry_sdk::{runtime, Resource};
use secrecy::{ExposeSecret, Secret};
use url::Url;

use crate::configuration::TelemetrySettings;

/// Header carrying the instrumentation key on every export request.
pub const INSTRUMENTATION_KEY_HEADER: &str = "x-instrumentation-key";

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("The connection string is missing `{0}`")]
    MissingField(&'static str),
    #[error("The ingestion endpoint is not a valid URL")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Failed to install the span exporter")]
    Exporter(#[from] opentelemetry::trace::TraceError),
}

/// Where and how to ship telemetry, parsed from a connection string.
#[derive(Debug)]
pub struct ConnectionString {
    pub instrumentation_key: Secret<String>,
    pub ingestion_endpoint: Url,
}

impl ConnectionString {
    /// Keys are matched case-insensitively and unknown keys are ignored.
    pub fn parse(s: &str) -> Result<Self, TelemetryError> {
        let pairs: HashMap<String, &str> = s
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (key.trim().to_lowercase(), value.trim()))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let instrumentation_key = pairs
            .get("instrumentationkey")
            .ok_or(TelemetryError::MissingField("InstrumentationKey"))?;
        let ingestion_endpoint = pairs
            .get("ingestionendpoint")
            .ok_or(TelemetryError::MissingField("IngestionEndpoint"))?;

        Ok(Self {
            instrumentation_key: Secret::new(instrumentation_key.to_string()),
            ingestion_endpoint: Url::parse(ingestion_endpoint)?,
        })
    }
}

/// Builds the span exporter when a connection string is configured.
///
/// Returns `Ok(None)` when telemetry is not configured. Must be called from
/// within a Tokio runtime, the batch exporter runs as a background task.
pub fn init_tracer(settings: &TelemetrySettings) -> Result<Option<Tracer>, TelemetryError> {
    let connection_string = match &settings.connection_string {
        Some(connection_string) => ConnectionString::parse(connection_string.expose_secret())?,
        None => return Ok(None),
    };

    let headers = HashMap::from([(
        INSTRUMENTATION_KEY_HEADER.to_string(),
        connection_string.instrumentation_key.expose_secret().clone(),
    )]);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .http()
                .with_endpoint(connection_string.ingestion_endpoint.as_str())
                .with_headers(headers),
        )
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(Resource::new(
            vec![KeyValue::new("service.name", settings.service_name.clone())],
        )))
        .install_batch(runtime::Tokio)?;

    Ok(Some(tracer))
}

/// Logs how telemetry setup went. Call once the tracing subscriber is installed.
pub fn report_setup(outcome: &Result<Option<Tracer>, TelemetryError>) {
    match outcome {
        Ok(Some(_)) => tracing::info!("Telemetry export enabled"),
        Ok(None) => tracing::warn!("No telemetry connection string set; telemetry disabled"),
        Err(e) => tracing::error!(error = %e, "Failed to enable telemetry export"),
    }
}

/// Flushes spans still queued in the exporter.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}
