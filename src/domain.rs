mod subscribe_form;
mod subscriber;
mod subscriber_email;
mod subscriber_repository;

pub use subscribe_form::{FormErrors, SubscribeForm};
pub use subscriber::{SubscribeOutcome, Subscriber};
pub use subscriber_email::{SubscriberEmail, MAX_EMAIL_LENGTH};
pub use subscriber_repository::{is_unique_violation, SubscriberRepository};
