use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;

/// App-wide configuration
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Signs the flash message cookie. Any non-empty value; it is stretched into
    /// a 64-byte key at startup.
    pub secret_key: Secret<String>,
}

/// Settings needed for connecting to a DB.
#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub dialect: DatabaseDialect,
    /// File used by the embedded backend. Ignored for networked backends.
    pub sqlite_path: String,
    pub username: String,
    pub password: Secret<String>,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

#[derive(Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    /// When set, JSON log lines are also appended to `<directory>/app.jsonl`.
    pub directory: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub connection_string: Option<Secret<String>>,
}

/// Which SQL backend stores the subscribers table.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum DatabaseDialect {
    Sqlite,
    MySql,
}

impl DatabaseDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDialect::Sqlite => "sqlite",
            DatabaseDialect::MySql => "mysql",
        }
    }
}

impl TryFrom<String> for DatabaseDialect {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "mysql" => Ok(Self::MySql),
            other => Err(format!(
                "Unsupported database dialect: {}. Use either sqlite or mysql",
                other
            )),
        }
    }
}

/// The environment the app runs in. Picks the environment specific config file.
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either local or production",
                other
            )),
        }
    }
}

/// Flat environment variables the app has always been deployed with, and the
/// settings key each of them overrides.
const LEGACY_VARIABLES: [(&str, &str); 9] = [
    ("SECRET_KEY", "application.secret_key"),
    ("DB_DIALECT", "database.dialect"),
    ("DB_USER", "database.username"),
    ("DB_PASS", "database.password"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.database_name"),
    ("APP_LOG_DIR", "logging.directory"),
    (
        "APPLICATIONINSIGHTS_CONNECTION_STRING",
        "telemetry.connection_string",
    ),
];

/// Reads app configuration from the `configuration` directory and the environment.
///
/// Layers, later ones win:
/// * `configuration/base.yaml`
/// * `configuration/{local,production}.yaml`, picked by `APP_ENVIRONMENT`
/// * `APP_`-prefixed variables, e.g. `APP_APPLICATION__PORT=5001`
/// * the flat variables listed in `LEGACY_VARIABLES`, e.g. `DB_DIALECT=mysql`
///
/// Returns an error if any source is unreadable or the merged result doesn't
/// deserialize into `Settings`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("No current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let mut builder = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        );

    for (variable, key) in LEGACY_VARIABLES {
        builder = builder.set_override_option(key, std::env::var(variable).ok())?;
    }

    builder.build()?.try_deserialize()
}

impl DatabaseSettings {
    /// Connection options for the embedded file backend. The file is created on
    /// first use.
    pub fn sqlite_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.sqlite_path)
            .create_if_missing(true)
    }

    /// Connection options for the networked backend.
    pub fn mysql_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.password.expose_secret())
            .database(&self.database_name)
    }
}
