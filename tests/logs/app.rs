use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use subscriber_app::{
    configuration::{get_configuration, DatabaseDialect},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber, log_sink, LOG_FILE_NAME},
};
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

/// In-memory copy of every JSON line the subscriber writes.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Parsed log lines that carry `request_id`, in the order they were written.
    pub fn lines_for(&self, request_id: &str) -> Vec<Value> {
        let bytes = self.0.lock().unwrap();
        lines_with_request_id(&String::from_utf8_lossy(&bytes), request_id)
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub static LOGS: Lazy<CapturedLogs> = Lazy::new(CapturedLogs::default);

pub static LOG_DIRECTORY: Lazy<PathBuf> =
    Lazy::new(|| std::env::temp_dir().join(Uuid::new_v4().to_string()).join("logs"));

// Every test in this binary shares one global subscriber, so tests pick out
// their own lines by request id.
static TRACING: Lazy<()> = Lazy::new(|| {
    let sink = log_sink(LOGS.clone(), LOG_DIRECTORY.to_str())
        .expect("Failed to open the log file");
    init_subscriber(get_subscriber("test".into(), "info".into(), sink, None));
});

pub struct TestApp {
    pub address: String,
    pub db_pool: SqlitePool,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_subscriptions(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/subscribe", self.address))
            .header("Content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_health_check(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/health", &self.address))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn drop_subscribers_table(&self) {
        sqlx::query("DROP TABLE subscribers")
            .execute(&self.db_pool)
            .await
            .expect("Failed to drop the subscribers table");
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration");
        c.database.dialect = DatabaseDialect::Sqlite;
        c.database.sqlite_path = std::env::temp_dir()
            .join(format!("{}.db", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        c.application.host = "127.0.0.1".into();
        c.application.port = 0;
        c.telemetry.connection_string = None;
        c
    };

    let app = Application::build(configuration.clone())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());
    let _ = tokio::spawn(app.run_until_stopped());

    let db_pool = SqlitePoolOptions::new().connect_lazy_with(
        SqliteConnectOptions::new().filename(&configuration.database.sqlite_path),
    );

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent("subscriber-app-tests")
        .build()
        .unwrap();

    TestApp {
        address,
        db_pool,
        api_client,
    }
}

pub fn request_id(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("x-request-id")
        .expect("Missing x-request-id header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Lines of the on-disk log file that carry `request_id`.
pub fn log_file_lines_for(request_id: &str) -> Vec<Value> {
    let contents = std::fs::read_to_string(LOG_DIRECTORY.join(LOG_FILE_NAME))
        .expect("Failed to read the log file");
    lines_with_request_id(&contents, request_id)
}

/// The `event` values of `lines`, skipping span start/end records.
pub fn events(lines: &[Value]) -> Vec<&str> {
    lines.iter().filter_map(|l| l["event"].as_str()).collect()
}

/// The first line whose `event` is `name`.
pub fn find_event<'a>(lines: &'a [Value], name: &str) -> &'a Value {
    lines
        .iter()
        .find(|l| l["event"] == name)
        .unwrap_or_else(|| panic!("No {} event in {:#?}", name, lines))
}

fn lines_with_request_id(contents: &str, request_id: &str) -> Vec<Value> {
    contents
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(|line| line["request_id"] == request_id)
        .collect()
}
