use std::net::TcpListener;
use std::sync::Arc;

use actix_web::cookie::Key;
use actix_web::dev::{Server, Service};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, App, HttpMessage, HttpServer};
use actix_web_flash_messages::storage::CookieMessageStore;
use actix_web_flash_messages::FlashMessagesFramework;
use anyhow::Context;
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, Secret};
use tracing_actix_web::{RequestId, TracingLogger};

use crate::adapters::{MySqlSubscriberRepository, SqliteSubscriberRepository};
use crate::configuration::{DatabaseDialect, DatabaseSettings, Settings};
use crate::domain::SubscriberRepository;
use crate::routes::{health_check, home, list_subscribers, subscribe};
use crate::telemetry::RequestSpanBuilder;

/// A running application
pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Build an HTTP server running our app. The behavior of the app is configured
    /// through the `settings` argument.
    ///
    /// The subscribers table is created before the server starts accepting requests.
    pub async fn build(settings: Settings) -> Result<Self, anyhow::Error> {
        let repository = get_repository(&settings.database);
        repository
            .apply_migrations()
            .await
            .context("Failed to prepare the subscribers table")?;

        let app_config = settings.application;
        let app_address = format!("{}:{}", &app_config.host, app_config.port);
        let listener = TcpListener::bind(&app_address)
            .with_context(|| format!("Failed to bind to {}", app_address))?;
        let port = listener.local_addr()?.port();

        let server = run(listener, repository, app_config.secret_key)?;
        Ok(Self { port, server })
    }

    /// The port that the app is listening on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Listen and handle requests until we receive a stop signal
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// Get the repository for the configured backend. Connections are opened lazily.
pub fn get_repository(settings: &DatabaseSettings) -> Arc<dyn SubscriberRepository> {
    tracing::info!(dialect = settings.dialect.as_str(), "Using database backend");
    match settings.dialect {
        DatabaseDialect::Sqlite => Arc::new(SqliteSubscriberRepository::connect_lazy(
            settings.sqlite_options(),
        )),
        DatabaseDialect::MySql => Arc::new(MySqlSubscriberRepository::connect_lazy(
            settings.mysql_options(),
        )),
    }
}

/// Fixed salt so the same secret always yields the same cookie key across restarts.
const SIGNING_KEY_SALT: &[u8] = b"subscriber-app/flash-cookies";

/// Stretches the configured secret into the 64-byte key that signs flash cookies.
///
/// Any non-empty secret is accepted, whatever its length.
pub fn signing_key(secret: &Secret<String>) -> Result<Key, anyhow::Error> {
    let secret = secret.expose_secret();
    if secret.trim().is_empty() {
        anyhow::bail!("The secret key must not be empty");
    }

    let params = Params::new(15000, 2, 1, Some(64))
        .map_err(|e| anyhow::anyhow!("Invalid key derivation parameters: {}", e))?;
    let mut key_material = [0u8; 64];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(secret.as_bytes(), SIGNING_KEY_SALT, &mut key_material)
        .map_err(|e| anyhow::anyhow!("Failed to derive the cookie signing key: {}", e))?;

    Ok(Key::from(&key_material[..]))
}

/// Starts a server, listening on `listener`, running in the background and returns it
fn run(
    listener: TcpListener,
    repository: Arc<dyn SubscriberRepository>,
    secret_key: Secret<String>,
) -> Result<Server, anyhow::Error> {
    let message_store = CookieMessageStore::builder(signing_key(&secret_key)?).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();

    let repository: web::Data<dyn SubscriberRepository> = web::Data::from(repository);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(message_framework.clone())
            .wrap_fn(|req, srv| {
                let request_id = req.extensions().get::<RequestId>().copied();
                let res = srv.call(req);
                async move {
                    let mut res = res.await?;
                    if let Some(value) =
                        request_id.and_then(|id| HeaderValue::from_str(&id.to_string()).ok())
                    {
                        res.headers_mut()
                            .insert(HeaderName::from_static("x-request-id"), value);
                    }
                    Ok(res)
                }
            })
            .wrap(TracingLogger::<RequestSpanBuilder>::new())
            .route("/", web::get().to(home))
            .route("/subscribe", web::post().to(subscribe))
            .route("/subscribers", web::get().to(list_subscribers))
            .route("/health", web::get().to(health_check))
            .app_data(repository.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
