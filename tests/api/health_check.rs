use crate::app;

#[actix_web::test]
async fn health_check_works() {
    let app = app::spawn_app().await;

    let response = app.get_health_check().await;

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[actix_web::test]
async fn health_check_does_not_depend_on_the_database() {
    let app = app::spawn_app().await;
    app.drop_subscribers_table().await;

    let response = app.get_health_check().await;

    assert_eq!(response.status().as_u16(), 200);
}

#[actix_web::test]
async fn responses_carry_a_request_id() {
    let app = app::spawn_app().await;

    let first = app.get_health_check().await;
    let second = app.get_health_check().await;

    let first_id = first.headers().get("x-request-id").unwrap().clone();
    let second_id = second.headers().get("x-request-id").unwrap().clone();
    assert_ne!(first_id, second_id);
}
