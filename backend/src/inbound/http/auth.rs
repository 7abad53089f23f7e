//! Bearer-token authentication for HTTP handlers.
//!
//! [`Caller`] resolves the `Authorization: Bearer <token>` header into a
//! [`Requester`]. A request without the header is anonymous; a header that
//! is malformed, carries a rejected token, or names a deleted account fails
//! with `401`. The role is read from the store on every request so a role
//! change takes effect without reissuing tokens.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use serde_json::json;
use tracing::debug;

use crate::domain::Error;
use crate::domain::access::Requester;

use super::state::HttpState;

const BEARER_PREFIX: &str = "bearer ";

/// The resolved caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Requester);

impl Caller {
    /// Borrow the requester for service calls.
    pub fn requester(&self) -> &Requester {
        &self.0
    }
}

fn invalid_credentials(reason: &'static str) -> Error {
    Error::unauthorized("authentication credentials are invalid")
        .with_details(json!({ "reason": reason }))
}

fn bearer_token(req: &HttpRequest) -> Result<Option<String>, Error> {
    let Some(value) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| invalid_credentials("malformed_header"))?;
    let scheme = raw.get(..BEARER_PREFIX.len()).unwrap_or_default();
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return Err(invalid_credentials("unsupported_scheme"));
    }
    let token = raw.get(BEARER_PREFIX.len()..).unwrap_or_default().trim();
    if token.is_empty() {
        return Err(invalid_credentials("malformed_header"));
    }
    Ok(Some(token.to_owned()))
}

async fn resolve(state: &HttpState, token: &str) -> Result<Requester, Error> {
    let subject = state.token_verifier.verify(token).map_err(|err| {
        debug!(error = %err, "bearer token rejected");
        invalid_credentials("invalid_token")
    })?;
    let user = state
        .identities
        .find_by_id(&subject.user_id)
        .await?
        .ok_or_else(|| invalid_credentials("unknown_user"))?;
    Ok(Requester::from_user(&user))
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state.ok_or_else(|| Error::internal("HTTP state is not configured"))?;
            let requester = match token? {
                None => Requester::Anonymous,
                Some(token) => resolve(&state, &token).await?,
            };
            Ok(Caller(requester))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::Tier;
    use crate::domain::{Role, User};
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};
    use rstest::rstest;
    use serde_json::Value;

    async fn whoami(caller: Caller) -> HttpResponse {
        let body = match caller.0 {
            Requester::Anonymous => "anonymous".to_owned(),
            Requester::Authenticated { tier, .. } => format!("{tier:?}"),
        };
        HttpResponse::Ok().body(body)
    }

    async fn call(harness: &TestHarness, header: Option<String>) -> (StatusCode, String) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.state()))
                .route("/", web::get().to(whoami)),
        )
        .await;
        let mut req = test::TestRequest::get().uri("/");
        if let Some(value) = header {
            req = req.insert_header((AUTHORIZATION, value));
        }
        let res = test::call_service(&app, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[actix_web::test]
    async fn missing_header_is_anonymous() {
        let harness = TestHarness::new();
        let (status, body) = call(&harness, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[rstest]
    #[case(Role::User, Tier::User)]
    #[case(Role::Moderator, Tier::Moderator)]
    #[case(Role::Admin, Tier::Admin)]
    #[actix_web::test]
    async fn valid_tokens_resolve_the_stored_role(#[case] role: Role, #[case] tier: Tier) {
        let harness = TestHarness::new();
        let user = harness.seed_user("ada", role);
        let (status, body) = call(&harness, Some(harness.bearer_for(&user))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{tier:?}"));
    }

    #[actix_web::test]
    async fn scheme_is_case_insensitive() {
        let harness = TestHarness::new();
        let user = harness.seed_user("ada", Role::User);
        let header = harness.bearer_for(&user).replacen("Bearer", "bEaReR", 1);
        let (status, _) = call(&harness, Some(header)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[case("Basic YWRhOnNlY3JldA==", "unsupported_scheme")]
    #[case("Bearer ", "malformed_header")]
    #[case("Bearer not-a-jwt", "invalid_token")]
    #[actix_web::test]
    async fn bad_credentials_are_unauthorised(#[case] header: &str, #[case] reason: &str) {
        let harness = TestHarness::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.state()))
                .route("/", web::get().to(whoami)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((AUTHORIZATION, header))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["reason"], reason);
    }

    #[actix_web::test]
    async fn tokens_for_deleted_accounts_are_unauthorised() {
        let harness = TestHarness::new();
        let user: User = harness.seed_user("ada", Role::User);
        let header = harness.bearer_for(&user);
        harness.delete_user("ada").await;
        let (status, _) = call(&harness, Some(header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
