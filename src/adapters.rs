mod mysql_subscriber_repository;
mod sqlite_subscriber_repository;

pub use mysql_subscriber_repository::MySqlSubscriberRepository;
pub use sqlite_subscriber_repository::SqliteSubscriberRepository;
