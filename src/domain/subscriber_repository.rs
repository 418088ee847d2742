use async_trait::async_trait;

use super::{SubscribeOutcome, Subscriber, SubscriberEmail};

/// Storage for the subscribers table. Implemented once per SQL backend.
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Creates the table if it doesn't exist yet. Safe to run on every startup.
    async fn apply_migrations(&self) -> Result<(), anyhow::Error>;

    /// Stores `email` unless it is already present.
    ///
    /// The existence check and the insert share one transaction, which is rolled
    /// back if either fails. A unique constraint violation on insert means another
    /// request stored the same address first and is reported as
    /// `SubscribeOutcome::AlreadySubscribed`.
    async fn subscribe(&self, email: &SubscriberEmail) -> Result<SubscribeOutcome, anyhow::Error>;

    /// All subscribers, newest first.
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, anyhow::Error>;
}

/// `true` when `e` is the storage layer rejecting a duplicate email.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}
