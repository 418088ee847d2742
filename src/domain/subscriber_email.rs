use validator::validate_email;

/// Longest address the subscribers table can hold.
pub const MAX_EMAIL_LENGTH: usize = 320;

/// A normalized subscriber email address. Enforces validity of the address, so any
/// instance of this is guaranteed to be well formed, trimmed, lower-cased and no
/// longer than [`MAX_EMAIL_LENGTH`] characters.
///
/// # Examples
/// Use the `parse` function to build a `SubscriberEmail` from a string.
/// We can then get the email address back out using the `AsRef<str>` implementation.
/// ```
/// use subscriber_app::domain::SubscriberEmail;
///
/// let email = SubscriberEmail::parse(" USER@Example.com ".to_string()).unwrap();
/// assert_eq!("user@example.com", email.as_ref());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Return `Ok` with a valid `SubscriberEmail` when `s` is a valid email address.
    /// Otherwise, returns `Err` with a message describing the problem, suitable for
    /// showing next to the form field.
    pub fn parse(s: String) -> Result<Self, String> {
        let email = s.trim().to_lowercase();

        if email.is_empty() {
            Err("This field is required.".to_string())
        } else if email.chars().count() > MAX_EMAIL_LENGTH {
            Err(format!(
                "Email must be at most {} characters long.",
                MAX_EMAIL_LENGTH
            ))
        } else if !validate_email(&email) || !has_dotted_domain(&email) {
            Err("Invalid email address.".to_string())
        } else {
            Ok(SubscriberEmail(email))
        }
    }
}

/// Deliverable addresses need a domain with at least one inner dot, so
/// `user@localhost` and `user@example.` are rejected.
fn has_dotted_domain(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((_, domain)) => {
            domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
