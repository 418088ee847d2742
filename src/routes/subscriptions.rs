use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use actix_web_flash_messages::FlashMessage;

use super::home::{render_form, Notice};
use crate::domain::{FormErrors, SubscribeForm, SubscribeOutcome, SubscriberRepository};
use crate::utils::{error_chain_fmt, see_other};

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Invalid email address. Please try again.")]
    ValidationError { email: String, errors: FormErrors },
    #[error("Something went wrong. Please try again later.")]
    UnexpectedError(#[source] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            SubscribeError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failures re-render the form in place rather than redirecting, so the
    /// submitted value and the field errors are still on screen.
    fn error_response(&self) -> HttpResponse {
        let notices = [Notice::error(self.to_string())];
        match self {
            SubscribeError::ValidationError { email, errors } => {
                render_form(self.status_code(), &notices, email, errors)
            }
            SubscribeError::UnexpectedError(_) => {
                render_form(self.status_code(), &notices, "", &FormErrors::default())
            }
        }
    }
}

/// Adds a new subscriber, then redirects back to the form (Post/Redirect/Get).
///
/// An address that is already stored is not an error: the user is told so and
/// nothing is written.
#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(form, repository),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    form: web::Form<SubscribeForm>,
    repository: web::Data<dyn SubscriberRepository>,
) -> Result<HttpResponse, SubscribeError> {
    tracing::info!(event = "subscribe_attempt", email = %form.email, "Subscription attempt");

    let email = form.validate().map_err(|errors| {
        tracing::info!(event = "subscribe_invalid", email = %form.email, ?errors, "Invalid subscription form");
        SubscribeError::ValidationError {
            email: form.email.clone(),
            errors,
        }
    })?;

    match repository.subscribe(&email).await {
        Ok(SubscribeOutcome::Created(subscriber)) => {
            tracing::info!(
                event = "subscribe_success",
                email = %email,
                subscriber_id = subscriber.id,
                "New subscriber stored"
            );
            FlashMessage::success("Subscription successful! Thank you.").send();
        }
        Ok(SubscribeOutcome::AlreadySubscribed) => {
            tracing::info!(event = "subscribe_duplicate", email = %email, "Email already subscribed");
            FlashMessage::info("This email is already subscribed.").send();
        }
        Err(e) => {
            tracing::error!(
                event = "subscribe_db_error",
                email = %email,
                error = ?e,
                "Failed to store subscriber"
            );
            return Err(SubscribeError::UnexpectedError(e));
        }
    }

    Ok(see_other("/"))
}
