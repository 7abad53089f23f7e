//! Sign-up service behaviour against mocked ports.

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    MockConfirmationCodeGenerator, MockIdentityStore, MockNotificationSink, NotificationError,
};
use crate::test_support::FixedClock;
use rstest::{fixture, rstest};

type Service = SignUpService<MockIdentityStore, MockNotificationSink, MockConfirmationCodeGenerator>;

#[fixture]
fn request() -> SignUpRequest {
    SignUpRequest::try_from_parts("ada", "ada@example.com").expect("valid request")
}

fn account(username: &str, email: &str) -> User {
    User::register(
        Username::new(username).expect("username"),
        EmailAddress::new(email).expect("email"),
        ConfirmationCode::new("OLDOLDOLDOLD").expect("code"),
        FixedClock::default_instant(),
    )
}

fn codes(value: &'static str) -> MockConfirmationCodeGenerator {
    let mut codes = MockConfirmationCodeGenerator::new();
    codes
        .expect_generate()
        .returning(move || ConfirmationCode::new(value).expect("code"));
    codes
}

fn delivering_sink(expected_body: &'static str) -> MockNotificationSink {
    let mut sink = MockNotificationSink::new();
    sink.expect_send()
        .withf(move |notification| {
            notification.subject == CONFIRMATION_SUBJECT && notification.body == expected_body
        })
        .times(1)
        .returning(|_| Ok(()));
    sink
}

fn service(
    store: MockIdentityStore,
    sink: MockNotificationSink,
    codes: MockConfirmationCodeGenerator,
) -> Service {
    SignUpService::new(
        Arc::new(store),
        Arc::new(sink),
        Arc::new(codes),
        Arc::new(FixedClock::default()),
    )
}

#[rstest]
#[case("me", "ada@example.com")]
#[case("me", "not-an-email")]
fn reserved_username_is_rejected_regardless_of_email(#[case] username: &str, #[case] email: &str) {
    let error = SignUpRequest::try_from_parts(username, email).expect_err("reserved");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().and_then(|d| d.get("field")),
        Some(&serde_json::Value::from("username"))
    );
}

#[rstest]
#[tokio::test]
async fn new_pair_registers_and_delivers(request: SignUpRequest) {
    let mut store = MockIdentityStore::new();
    store.expect_find_by_username().returning(|_| Ok(None));
    store.expect_find_by_email().returning(|_| Ok(None));
    store
        .expect_insert()
        .withf(|user| {
            user.username.as_str() == "ada"
                && user
                    .confirmation_code
                    .as_ref()
                    .is_some_and(|code| code.matches("NEWCODE12345"))
        })
        .times(1)
        .returning(|_| Ok(()));

    let receipt = service(
        store,
        delivering_sink("Your confirmation code: NEWCODE12345"),
        codes("NEWCODE12345"),
    )
    .request_sign_up(request)
    .await
    .expect("sign-up succeeds");

    assert_eq!(receipt.username.as_str(), "ada");
    assert_eq!(receipt.email.as_str(), "ada@example.com");
}

#[rstest]
#[tokio::test]
async fn same_pair_rotates_the_code(request: SignUpRequest) {
    let existing = account("ada", "ada@example.com");
    let existing_id = existing.id;
    let by_email = existing.clone();
    let mut store = MockIdentityStore::new();
    store
        .expect_find_by_username()
        .returning(move |_| Ok(Some(existing.clone())));
    store
        .expect_find_by_email()
        .returning(move |_| Ok(Some(by_email.clone())));
    store.expect_insert().never();
    store
        .expect_set_confirmation_code()
        .withf(move |id, code| *id == existing_id && code.matches("ROTATED12345"))
        .times(1)
        .returning(|_, _| Ok(()));

    let result = service(
        store,
        delivering_sink("Your confirmation code: ROTATED12345"),
        codes("ROTATED12345"),
    )
    .request_sign_up(request)
    .await;

    assert!(result.is_ok());
}

#[rstest]
#[case(true, false, vec!["username"])]
#[case(false, true, vec!["email"])]
#[tokio::test]
async fn partial_matches_conflict(
    request: SignUpRequest,
    #[case] username_taken: bool,
    #[case] email_taken: bool,
    #[case] fields: Vec<&'static str>,
) {
    let mut store = MockIdentityStore::new();
    store.expect_find_by_username().returning(move |_| {
        Ok(username_taken.then(|| account("ada", "someone-else@example.com")))
    });
    store
        .expect_find_by_email()
        .returning(move |_| Ok(email_taken.then(|| account("grace", "ada@example.com"))));
    store.expect_insert().never();
    let mut sink = MockNotificationSink::new();
    sink.expect_send().never();

    let error = service(store, sink, codes("UNUSED123456"))
        .request_sign_up(request)
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|d| d.get("fields")),
        Some(&serde_json::json!(fields))
    );
}

#[rstest]
#[tokio::test]
async fn username_and_email_on_different_accounts_conflict(request: SignUpRequest) {
    let mut store = MockIdentityStore::new();
    store
        .expect_find_by_username()
        .returning(|_| Ok(Some(account("ada", "other@example.com"))));
    store
        .expect_find_by_email()
        .returning(|_| Ok(Some(account("grace", "ada@example.com"))));

    let error = service(store, MockNotificationSink::new(), codes("UNUSED123456"))
        .request_sign_up(request)
        .await
        .expect_err("conflict");

    assert_eq!(
        error.details().and_then(|d| d.get("fields")),
        Some(&serde_json::json!(["username", "email"]))
    );
}

#[rstest]
#[tokio::test]
async fn racing_insert_surfaces_as_conflict(request: SignUpRequest) {
    let mut store = MockIdentityStore::new();
    store.expect_find_by_username().returning(|_| Ok(None));
    store.expect_find_by_email().returning(|_| Ok(None));
    store
        .expect_insert()
        .returning(|_| Err(IdentityStoreError::duplicate("username")));

    let error = service(store, MockNotificationSink::new(), codes("RACE12345678"))
        .request_sign_up(request)
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn delivery_failure_does_not_fail_sign_up(request: SignUpRequest) {
    let mut store = MockIdentityStore::new();
    store.expect_find_by_username().returning(|_| Ok(None));
    store.expect_find_by_email().returning(|_| Ok(None));
    store.expect_insert().returning(|_| Ok(()));
    let mut sink = MockNotificationSink::new();
    sink.expect_send()
        .times(1)
        .returning(|_| Err(NotificationError::delivery("smtp down")));

    let result = service(store, sink, codes("MAILFAIL1234"))
        .request_sign_up(request)
        .await;

    assert!(result.is_ok());
}

#[rstest]
#[tokio::test]
async fn store_outage_maps_to_service_unavailable(request: SignUpRequest) {
    let mut store = MockIdentityStore::new();
    store
        .expect_find_by_username()
        .returning(|_| Err(IdentityStoreError::connection("pool exhausted")));

    let error = service(store, MockNotificationSink::new(), MockConfirmationCodeGenerator::new())
        .request_sign_up(request)
        .await
        .expect_err("outage");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}
