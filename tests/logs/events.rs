use crate::app::{self, events, find_event, request_id, LOGS};

#[actix_web::test]
async fn a_new_subscription_logs_attempt_then_success_under_one_request_id() {
    let app = app::spawn_app().await;

    let response = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await;
    let request_id = request_id(&response);

    let lines = LOGS.lines_for(&request_id);
    assert_eq!(
        events(&lines),
        ["subscribe_attempt", "subscribe_success", "http_request"]
    );
    assert_eq!(
        find_event(&lines, "subscribe_success")["email"],
        "ursula_le_guin@gmail.com"
    );
}

#[actix_web::test]
async fn the_request_summary_carries_status_method_path_client_and_user_agent() {
    let app = app::spawn_app().await;

    let response = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await;
    let request_id = request_id(&response);

    let lines = LOGS.lines_for(&request_id);
    let summary = find_event(&lines, "http_request");
    assert_eq!(summary["status_code"], 303);
    assert_eq!(summary["http.method"], "POST");
    assert_eq!(summary["http.target"], "/subscribe");
    assert_eq!(summary["http.user_agent"], "subscriber-app-tests");
    assert!(summary["http.client_ip"]
        .as_str()
        .unwrap()
        .starts_with("127.0.0.1"));
}

#[actix_web::test]
async fn a_repeated_subscription_logs_a_duplicate() {
    let app = app::spawn_app().await;
    app.post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await;

    let response = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await;
    let request_id = request_id(&response);

    assert_eq!(
        events(&LOGS.lines_for(&request_id)),
        ["subscribe_attempt", "subscribe_duplicate", "http_request"]
    );
}

#[actix_web::test]
async fn an_invalid_form_logs_the_rejection_and_a_400_summary() {
    let app = app::spawn_app().await;

    let response = app.post_subscriptions("email=not-an-email".into()).await;
    let request_id = request_id(&response);

    let lines = LOGS.lines_for(&request_id);
    assert_eq!(
        events(&lines),
        ["subscribe_attempt", "subscribe_invalid", "http_request"]
    );
    assert_eq!(find_event(&lines, "http_request")["status_code"], 400);
}

#[actix_web::test]
async fn a_storage_failure_logs_the_error_and_a_500_summary() {
    let app = app::spawn_app().await;
    app.drop_subscribers_table().await;

    let response = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await;
    let request_id = request_id(&response);

    let lines = LOGS.lines_for(&request_id);
    assert_eq!(
        events(&lines),
        ["subscribe_attempt", "subscribe_db_error", "http_request"]
    );
    assert!(find_event(&lines, "subscribe_db_error")["error"].is_string());
    assert_eq!(find_event(&lines, "http_request")["status_code"], 500);
}

#[actix_web::test]
async fn a_health_check_logs_its_own_event() {
    let app = app::spawn_app().await;

    let response = app.get_health_check().await;
    let request_id = request_id(&response);

    assert_eq!(
        events(&LOGS.lines_for(&request_id)),
        ["health_check", "http_request"]
    );
}
