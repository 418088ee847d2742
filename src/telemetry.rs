use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use opentelemetry_sdk::trace::Tracer;
use tracing::subscriber::set_global_default;
use tracing::{Span, Subscriber};
use tracing_actix_web::{DefaultRootSpanBuilder, RootSpanBuilder};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Name of the JSON lines file created inside the configured log directory.
pub const LOG_FILE_NAME: &str = "app.jsonl";

/// Composes layers into a full `tracing` subscriber.
///
/// `name` will be attached to all logged messages.
///
/// `default_level` is the default logging level to use if not set in the environment.
///  Should be one of "info", "warn", "debug", "error", or "trace".
///
/// `sink` is where all logs will be written. You can use this to optionally swallow logging.
///
/// `tracer`, when present, additionally exports spans to the telemetry backend.
///
/// # Implementation Notes
///
/// We're returning an impl rather than a concrete type for simplicity.
/// We also need `Send` and `Sync` to fully subscribe later on.
pub fn get_subscriber<Sink>(
    name: String,
    default_level: String,
    sink: Sink,
    tracer: Option<Tracer>,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let telemetry_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
    let format_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(telemetry_layer)
        .with(JsonStorageLayer)
        .with(format_layer)
}

/// Registers a global default subscriber for our telemetry, and redirects `log`
/// records from our dependencies into it.
///
/// Do not call this multiple times!
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to subscribe to tracing.");
}

/// Opens `<directory>/app.jsonl` for appending, creating the directory if needed.
pub fn open_log_file(directory: impl AsRef<Path>) -> std::io::Result<File> {
    let directory = directory.as_ref();
    std::fs::create_dir_all(directory)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(directory.join(LOG_FILE_NAME))
}

/// Writes to `sink`, and also to `<directory>/app.jsonl` when a log directory is set.
pub fn log_sink<Sink>(sink: Sink, directory: Option<&str>) -> std::io::Result<BoxMakeWriter>
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    match directory {
        Some(directory) => {
            let log_file = open_log_file(directory)?;
            Ok(BoxMakeWriter::new(sink.and(Mutex::new(log_file))))
        }
        None => Ok(BoxMakeWriter::new(sink)),
    }
}

/// Root span for every inbound request.
///
/// The span carries the generated `request_id` plus method, path, client address
/// and user agent, so every event logged while handling the request is correlated.
/// When the request completes an `http_request` summary event is emitted with the
/// response status.
pub struct RequestSpanBuilder;

impl RootSpanBuilder for RequestSpanBuilder {
    fn on_request_start(request: &ServiceRequest) -> Span {
        tracing_actix_web::root_span!(request)
    }

    fn on_request_end<B: MessageBody>(
        span: Span,
        outcome: &Result<ServiceResponse<B>, actix_web::Error>,
    ) {
        let status = match outcome {
            Ok(response) => response.response().status(),
            Err(error) => error.as_response_error().status_code(),
        };
        span.in_scope(|| {
            tracing::info!(
                event = "http_request",
                status_code = status.as_u16(),
                "HTTP request completed"
            );
        });

        DefaultRootSpanBuilder::on_request_end(span, outcome);
    }
}
