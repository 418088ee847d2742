use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqlitePool, Transaction};

use crate::domain::{
    is_unique_violation, SubscribeOutcome, Subscriber, SubscriberEmail, SubscriberRepository,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Subscribers stored in a single SQLite file on local disk.
#[derive(Debug, Clone)]
pub struct SqliteSubscriberRepository {
    pool: SqlitePool,
}

impl SqliteSubscriberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Builds a repository over a lazily connected pool.
    ///
    /// Connections use the write-ahead log and wait up to `BUSY_TIMEOUT` for the
    /// write lock.
    pub fn connect_lazy(options: SqliteConnectOptions) -> Self {
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        Self::new(SqlitePoolOptions::new().connect_lazy_with(options))
    }
}

#[async_trait]
impl SubscriberRepository for SqliteSubscriberRepository {
    #[tracing::instrument(name = "Applying sqlite migrations", skip(self))]
    async fn apply_migrations(&self) -> Result<(), anyhow::Error> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .context("Failed to migrate the sqlite database")?;
        Ok(())
    }

    #[tracing::instrument(name = "Saving subscriber in sqlite", skip(self))]
    async fn subscribe(&self, email: &SubscriberEmail) -> Result<SubscribeOutcome, anyhow::Error> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a sqlite connection from the pool")?;

        match insert_if_absent(&mut transaction, email).await {
            Ok(outcome) => {
                transaction
                    .commit()
                    .await
                    .context("Failed to commit the new subscriber")?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_error) = transaction.rollback().await {
                    tracing::error!("Failed to roll back transaction: {:?}", rollback_error);
                }
                if is_unique_violation(&e) {
                    return Ok(SubscribeOutcome::AlreadySubscribed);
                }
                Err(e).context("Failed to store the new subscriber")
            }
        }
    }

    #[tracing::instrument(name = "Listing subscribers from sqlite", skip(self))]
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, anyhow::Error> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT id, email, created_at
            FROM subscribers
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch subscribers")?;

        Ok(subscribers)
    }
}

/// Inserts `email` unless it is already stored.
///
/// The conflict clause is the existence check, so the first statement of the
/// transaction takes the write lock. A read followed by a write would need a lock
/// upgrade, which SQLite refuses with `database is locked` while another
/// request holds a read lock.
async fn insert_if_absent(
    transaction: &mut Transaction<'_, sqlx::Sqlite>,
    email: &SubscriberEmail,
) -> Result<SubscribeOutcome, sqlx::Error> {
    let created_at = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO subscribers (email, created_at)
        VALUES (?, ?)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(email.as_ref())
    .bind(created_at)
    .execute(&mut **transaction)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(SubscribeOutcome::AlreadySubscribed);
    }

    Ok(SubscribeOutcome::Created(Subscriber {
        id: result.last_insert_rowid(),
        email: email.as_ref().to_string(),
        created_at,
    }))
}
