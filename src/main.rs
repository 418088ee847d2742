use anyhow::Context;
use subscriber_app::configuration::get_configuration;
use subscriber_app::monitoring;
use subscriber_app::startup::Application;
use subscriber_app::telemetry::{get_subscriber, init_subscriber, log_sink};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().context("Failed to read configuration")?;

    let telemetry = monitoring::init_tracer(&configuration.telemetry);
    let tracer = telemetry.as_ref().ok().cloned().flatten();

    let log_directory = configuration.logging.directory.as_deref();
    let sink = log_sink(std::io::stdout, log_directory)
        .with_context(|| format!("Failed to open the log file in {:?}", log_directory))?;
    init_subscriber(get_subscriber(
        "subscriber-app".into(),
        configuration.logging.level.clone(),
        sink,
        tracer,
    ));
    monitoring::report_setup(&telemetry);

    let application = Application::build(configuration).await?;
    tracing::info!(port = application.port(), "Listening");
    application.run_until_stopped().await?;

    monitoring::shutdown();
    Ok(())
}
