use chrono::{DateTime, Utc};

/// One stored subscription. Rows are never modified after insertion.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// What happened when we tried to store an address.
#[derive(Debug)]
pub enum SubscribeOutcome {
    Created(Subscriber),
    AlreadySubscribed,
}
