use std::fmt::Write;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use htmlescape::encode_minimal;

use crate::domain::SubscriberRepository;
use crate::utils::{e500, html_page};

/// Every subscriber, newest first.
#[tracing::instrument(name = "Listing subscribers", skip(repository))]
pub async fn list_subscribers(
    repository: web::Data<dyn SubscriberRepository>,
) -> Result<HttpResponse, actix_web::Error> {
    let subscribers = repository.list_subscribers().await.map_err(|e| {
        tracing::error!(error = ?e, "Failed to list subscribers");
        e500(e)
    })?;

    let mut rows_html = String::new();
    for subscriber in &subscribers {
        writeln!(
            rows_html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            subscriber.id,
            encode_minimal(&subscriber.email),
            subscriber.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .unwrap();
    }

    let body = format!(
        r#"<h1>Subscribers</h1>
<p>{count} subscriber(s)</p>
<table>
<thead><tr><th>ID</th><th>Email</th><th>Subscribed at</th></tr></thead>
<tbody>
{rows_html}</tbody>
</table>"#,
        count = subscribers.len(),
    );

    Ok(html_page(StatusCode::OK, "Subscribers", &body))
}
