use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySqlPool, Transaction};

use crate::domain::{
    is_unique_violation, SubscribeOutcome, Subscriber, SubscriberEmail, SubscriberRepository,
};

/// Subscribers stored on a networked MySQL server.
#[derive(Debug, Clone)]
pub struct MySqlSubscriberRepository {
    pool: MySqlPool,
}

impl MySqlSubscriberRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Builds a repository over a lazily connected pool. Connections are checked
    /// before being handed out, so a restarted server doesn't fail the next request.
    pub fn connect_lazy(options: MySqlConnectOptions) -> Self {
        Self::new(
            MySqlPoolOptions::new()
                .test_before_acquire(true)
                .connect_lazy_with(options),
        )
    }
}

#[async_trait]
impl SubscriberRepository for MySqlSubscriberRepository {
    #[tracing::instrument(name = "Applying mysql migrations", skip(self))]
    async fn apply_migrations(&self) -> Result<(), anyhow::Error> {
        sqlx::migrate!("./migrations/mysql")
            .run(&self.pool)
            .await
            .context("Failed to migrate the mysql database")?;
        Ok(())
    }

    #[tracing::instrument(name = "Saving subscriber in mysql", skip(self))]
    async fn subscribe(&self, email: &SubscriberEmail) -> Result<SubscribeOutcome, anyhow::Error> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a mysql connection from the pool")?;

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

    #[tracing::instrument(name = "Listing subscribers from mysql", skip(self))]
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

/// Inserts `email`, relying on the unique index for the existence check.
///
/// A concurrent insert of the same address waits on InnoDB's row lock and then
/// fails with a duplicate-key error, which `subscribe` reports as
/// `AlreadySubscribed`.
async fn insert_if_absent(
    transaction: &mut Transaction<'_, sqlx::MySql>,
    email: &SubscriberEmail,
) -> Result<SubscribeOutcome, sqlx::Error> {
    let created_at = Utc::now();
    let result = sqlx::query("INSERT INTO subscribers (email, created_at) VALUES (?, ?)")
        .bind(email.as_ref())
        .bind(created_at)
        .execute(&mut **transaction)
        .await?;

    Ok(SubscribeOutcome::Created(Subscriber {
        id: result.last_insert_id() as i64,
        email: email.as_ref().to_string(),
        created_at,
    }))
}
