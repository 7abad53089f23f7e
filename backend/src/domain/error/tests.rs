//! Tests for error construction, serialisation and HTTP rendering.

use super::*;
use actix_web::{ResponseError, body::to_bytes, http::StatusCode};
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn internal_error_case(expected_trace_id: String) -> Error {
    Error::internal("pool exploded")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"query": "select secret"}))
}

#[fixture]
fn conflict_case(expected_trace_id: String) -> Error {
    Error::conflict("review already exists")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"code": "duplicate_review"}))
}

#[rstest]
fn try_new_rejects_blank_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "  \t ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn try_with_trace_id_rejects_blank_values() {
    let result = Error::not_found("gone").try_with_trace_id(" ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn trace_id_is_absent_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn construction_captures_scoped_trace_id(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id.parse().expect("fixture is a uuid");
    let error = TraceId::scope(trace_id, async { Error::forbidden("nope") }).await;
    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[tokio::test]
async fn deserialised_errors_ignore_ambient_trace(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id.parse().expect("fixture is a uuid");
    let error = TraceId::scope(trace_id, async {
        serde_json::from_value::<Error>(json!({"code": "not_found", "message": "gone"}))
            .expect("payload deserialises")
    })
    .await;
    assert!(error.trace_id().is_none());
}

#[rstest]
fn serialises_camel_case_without_empty_fields() {
    let value = serde_json::to_value(Error::conflict("slug taken").with_trace_id("abc"))
        .expect("serialises");
    assert_eq!(
        value,
        json!({"code": "conflict", "message": "slug taken", "traceId": "abc"})
    );
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("who"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("no"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("gone"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("dup"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(error.status_code(), status);
}

async fn render(error: Error, expected_status: StatusCode, expected_trace_id: &str) -> Error {
    let response = error.error_response();
    assert_eq!(response.status(), expected_status);
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .expect("trace header is set")
        .to_str()
        .expect("trace header is ascii")
        .to_owned();
    assert_eq!(header, expected_trace_id);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading body succeeds");
    serde_json::from_slice(&bytes).expect("error payload deserialises")
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(
    #[from(internal_error_case)] internal: Error,
    expected_trace_id: String,
) {
    let payload = render(
        internal,
        StatusCode::INTERNAL_SERVER_ERROR,
        expected_trace_id.as_str(),
    )
    .await;
    assert_eq!(payload.code(), ErrorCode::InternalError);
    assert_eq!(payload.message(), "Internal server error");
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_details(
    #[from(conflict_case)] conflict: Error,
    expected_trace_id: String,
) {
    let payload = render(conflict, StatusCode::CONFLICT, expected_trace_id.as_str()).await;
    assert_eq!(payload.message(), "review already exists");
    assert_eq!(payload.details(), Some(&json!({"code": "duplicate_review"})));
}

#[derive(Debug, Clone)]
enum Construction {
    Built,
    Rejected(ErrorValidationError),
}

fn an_error_message(message: String) -> (ErrorCode, String) {
    (ErrorCode::InvalidRequest, message)
}

fn the_error_is_constructed(payload: (ErrorCode, String)) -> Construction {
    match Error::try_new(payload.0, payload.1) {
        Ok(_) => Construction::Built,
        Err(err) => Construction::Rejected(err),
    }
}

fn construction_reflects_message(result: Construction, blank: bool) {
    if blank {
        assert!(matches!(
            result,
            Construction::Rejected(ErrorValidationError::EmptyMessage)
        ));
    } else {
        assert!(matches!(result, Construction::Built));
    }
}

#[rstest]
#[case("score out of range", false)]
#[case("   ", true)]
fn constructing_errors(#[case] message: &str, #[case] blank: bool) {
    let payload = an_error_message(message.to_owned());
    let result = the_error_is_constructed(payload);
    construction_reflects_message(result, blank);
}
