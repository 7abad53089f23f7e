//! Sign-up, code exchange and bearer access through the assembled app.

// Not every suite uses every helper.
#[allow(dead_code)]
mod support;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use rstest::rstest;
use serde_json::{Value, json};

use critique::domain::Role;
use support::Api;

async fn sign_up(api: &Api, username: &str, email: &str) -> StatusCode {
    api.send(
        TestRequest::post()
            .uri("/api/v1/auth/signup")
            .set_json(json!({"username": username, "email": email})),
    )
    .await
    .status
}

async fn exchange(api: &Api, username: &str, code: &str) -> (StatusCode, Value) {
    let reply = api
        .send(
            TestRequest::post()
                .uri("/api/v1/auth/token")
                .set_json(json!({"username": username, "confirmation_code": code})),
        )
        .await;
    (reply.status, reply.body)
}

fn latest_code(api: &Api, email: &str) -> String {
    api.harness
        .notifications
        .last_code_for(email)
        .expect("a code was mailed")
}

#[actix_web::test]
async fn repeated_sign_up_keeps_one_account_and_only_the_latest_code_works() {
    let api = Api::new();

    assert_eq!(sign_up(&api, "ada", "ada@example.com").await, StatusCode::OK);
    let first = latest_code(&api, "ada@example.com");
    assert_eq!(sign_up(&api, "ada", "ada@example.com").await, StatusCode::OK);
    let second = latest_code(&api, "ada@example.com");

    assert_ne!(first, second);
    assert_eq!(api.harness.store.user_count(), 1);
    assert_eq!(api.harness.notifications.sent().len(), 2);

    let (stale, body) = exchange(&api, "ada", &first).await;
    assert_eq!(stale, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());

    let (fresh, body) = exchange(&api, "ada", &second).await;
    assert_eq!(fresh, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[rstest]
#[case::username_taken("ada", "someone@example.com")]
#[case::email_taken("grace", "ada@example.com")]
#[actix_web::test]
async fn mismatched_pairs_conflict(#[case] username: &str, #[case] email: &str) {
    let api = Api::new();
    sign_up(&api, "ada", "ada@example.com").await;

    assert_eq!(sign_up(&api, username, email).await, StatusCode::CONFLICT);
    assert_eq!(api.harness.store.user_count(), 1);
}

#[actix_web::test]
async fn exchanged_token_identifies_the_caller() {
    let api = Api::new();
    sign_up(&api, "ada", "ada@example.com").await;
    let code = latest_code(&api, "ada@example.com");
    let (_, body) = exchange(&api, "ada", &code).await;
    let token = body["token"].as_str().expect("token").to_owned();

    let reply = api
        .send(
            TestRequest::get()
                .uri("/api/v1/users/me")
                .insert_header(("Authorization", format!("Bearer {token}"))),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["username"], "ada");
    assert_eq!(reply.body["email"], "ada@example.com");
    assert_eq!(reply.body["role"], "user");
}

#[actix_web::test]
async fn self_update_cannot_escalate_the_role() {
    let api = Api::new();
    let ada = api.user("ada", Role::User);

    let reply = api
        .send_as(
            &ada,
            TestRequest::patch()
                .uri("/api/v1/users/me")
                .set_json(json!({"role": "admin", "bio": "Analyst"})),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["role"], "user");
    assert_eq!(reply.body["bio"], "Analyst");
}

#[actix_web::test]
async fn tokens_of_deleted_accounts_are_refused_with_a_trace_id() {
    let api = Api::new();
    let ada = api.user("ada", Role::User);
    api.harness.delete_user("ada").await;

    let reply = api
        .send_as(&ada, TestRequest::get().uri("/api/v1/users/me"))
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "unauthorized");
    let trace_id = reply.trace_id.expect("trace id header");
    assert_eq!(reply.body["traceId"].as_str(), Some(trace_id.as_str()));
}

#[rstest]
#[case("/health/ready")]
#[case("/health/live")]
#[actix_web::test]
async fn probes_sit_outside_the_versioned_scope(#[case] uri: &str) {
    let api = Api::new();

    let reply = api.send(TestRequest::get().uri(uri)).await;

    assert_eq!(reply.status, StatusCode::OK);
}
