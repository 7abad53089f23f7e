//! Tests for extractor error routing.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use actix_web::{App, HttpResponse, web};
use rstest::rstest;
use serde::Deserialize;
use serde_json::Value;

use super::*;

#[derive(Debug, Deserialize)]
struct Payload {
    #[expect(dead_code, reason = "only deserialisation is exercised")]
    score: u8,
}

async fn accepts_json(_body: web::Json<Payload>) -> HttpResponse {
    HttpResponse::NoContent().finish()
}

async fn accepts_query(_query: web::Query<Payload>) -> HttpResponse {
    HttpResponse::NoContent().finish()
}

async fn accepts_path(_id: web::Path<i64>) -> HttpResponse {
    HttpResponse::NoContent().finish()
}

async fn call(req: actix_test::TestRequest) -> (StatusCode, Value) {
    let app = actix_test::init_service(
        App::new().service(
            web::scope("")
                .configure(configure_extractors)
                .route("/json", web::post().to(accepts_json))
                .route("/query", web::get().to(accepts_query))
                .route("/path/{id}", web::get().to(accepts_path)),
        ),
    )
    .await;
    let res = actix_test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let body: Value = actix_test::read_body_json(res).await;
    (status, body)
}

#[rstest]
#[case::malformed_json(
    actix_test::TestRequest::post()
        .uri("/json")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"score\": "),
    "body"
)]
#[case::wrong_type(
    actix_test::TestRequest::post()
        .uri("/json")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"score\": \"ten\"}"),
    "body"
)]
#[case::bad_query(actix_test::TestRequest::get().uri("/query?score=lots"), "query")]
#[actix_web::test]
async fn payload_errors_use_the_error_envelope(
    #[case] req: actix_test::TestRequest,
    #[case] source: &str,
) {
    let (status, body) = call(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["source"], source);
}

#[actix_web::test]
async fn missing_content_type_is_reported() {
    let (status, body) = call(
        actix_test::TestRequest::post()
            .uri("/json")
            .set_payload("{\"score\": 3}"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "content_type");
}

#[actix_web::test]
async fn unparseable_path_segments_are_not_found() {
    let (status, body) = call(actix_test::TestRequest::get().uri("/path/abc")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[rstest]
fn internal_errors_promoted_from_actix_are_generic() {
    let err: Error = actix_web::error::ErrorBadGateway("upstream detail").into();
    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
}
