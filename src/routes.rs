mod health_check;
mod home;
mod subscribers;
mod subscriptions;

pub use health_check::health_check;
pub use home::home;
pub use subscribers::list_subscribers;
pub use subscriptions::{subscribe, SubscribeError};
