use std::fmt::Write;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web_flash_messages::{IncomingFlashMessages, Level};
use htmlescape::encode_minimal;

use crate::domain::{FormErrors, MAX_EMAIL_LENGTH};
use crate::utils::html_page;

/// A status message shown above the form.
pub struct Notice {
    pub category: &'static str,
    pub content: String,
}

impl Notice {
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            category: "error",
            content: content.into(),
        }
    }
}

/// The subscription form, along with whatever the previous request flashed.
pub async fn home(flash_messages: IncomingFlashMessages) -> HttpResponse {
    let notices: Vec<Notice> = flash_messages
        .iter()
        .map(|m| Notice {
            category: match m.level() {
                Level::Error => "error",
                Level::Warning => "warning",
                Level::Success => "success",
                _ => "info",
            },
            content: m.content().to_string(),
        })
        .collect();

    render_form(StatusCode::OK, &notices, "", &FormErrors::default())
}

/// Renders the form page. `email` pre-fills the field and `errors` are shown
/// inline next to the fields they belong to.
pub fn render_form(
    status: StatusCode,
    notices: &[Notice],
    email: &str,
    errors: &FormErrors,
) -> HttpResponse {
    let mut notices_html = String::new();
    for notice in notices {
        writeln!(
            notices_html,
            r#"<p class="flash {}"><i>{}</i></p>"#,
            notice.category,
            encode_minimal(&notice.content)
        )
        .unwrap();
    }

    let mut email_errors_html = String::new();
    for message in errors.field("email") {
        writeln!(
            email_errors_html,
            r#"<span class="field-error">{}</span>"#,
            encode_minimal(message)
        )
        .unwrap();
    }

    let body = format!(
        r#"<h1>Subscribe</h1>
{notices_html}<form action="/subscribe" method="post">
    <label for="email">Email</label>
    <input id="email" name="email" type="text" maxlength="{MAX_EMAIL_LENGTH}" value="{email}">
    {email_errors_html}
    <button type="submit">Subscribe</button>
</form>"#,
        email = encode_minimal(email),
    );

    html_page(status, "Subscribe", &body)
}
