use std::collections::BTreeMap;

use serde::Deserialize;

use super::SubscriberEmail;

/// The data being submitted from the subscription form.
///
/// A missing field deserializes to an empty string so that it is reported
/// through the same path as an empty one.
#[derive(Deserialize, Debug, Default)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
}

impl SubscribeForm {
    /// Runs every field rule and returns the normalized address, or the errors
    /// to show next to each field.
    pub fn validate(&self) -> Result<SubscriberEmail, FormErrors> {
        SubscriberEmail::parse(self.email.clone()).map_err(|message| {
            let mut errors = FormErrors::default();
            errors.add("email", message);
            errors
        })
    }
}

/// Field name to error messages, in a stable order for rendering.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Messages attached to `field`, empty if it passed validation.
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}
