use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

/// Liveness endpoint. Always responds `200 {"status":"ok"}` without touching the
/// database.
pub async fn health_check() -> HttpResponse {
    tracing::info!(event = "health_check", "Health check");
    HttpResponse::Ok().json(HealthStatus { status: "ok" })
}
