//! Passwordless authentication endpoints.
//!
//! ```text
//! POST /api/v1/auth/signup {"username":"ada","email":"ada@example.com"}
//! POST /api/v1/auth/token  {"username":"ada","confirmation_code":"Q3J5UHRvMTIz"}
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::signup::{SignUpReceipt, SignUpRequest};
use crate::domain::token::TokenRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Sign-up request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SignUpBody {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
}

/// Echo of the registered pair. The code itself only travels by email.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignUpResponse {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
}

impl From<SignUpReceipt> for SignUpResponse {
    fn from(receipt: SignUpReceipt) -> Self {
        Self {
            username: receipt.username.as_str().to_owned(),
            email: receipt.email.as_str().to_owned(),
        }
    }
}

/// Token request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TokenBody {
    #[schema(example = "ada")]
    #[serde(default)]
    pub username: String,
    #[schema(example = "Q3J5UHRvMTIz")]
    #[serde(default)]
    pub confirmation_code: String,
}

/// Bearer token for the `Authorization` header.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a (username, email) pair, or rotate its code, and email a
/// confirmation code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignUpBody,
    responses(
        (status = 200, description = "Confirmation code sent", body = SignUpResponse),
        (status = 400, description = "Invalid username or email", body = Error),
        (status = 409, description = "Username or email belongs to another account", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "signUp",
    security([])
)]
#[post("/auth/signup")]
pub async fn sign_up(
    state: web::Data<HttpState>,
    payload: web::Json<SignUpBody>,
) -> ApiResult<web::Json<SignUpResponse>> {
    let SignUpBody { username, email } = payload.into_inner();
    let request = SignUpRequest::try_from_parts(&username, &email)?;
    let receipt = state.signup.request_sign_up(request).await?;
    Ok(web::Json(receipt.into()))
}

/// Exchange a confirmation code for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    request_body = TokenBody,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing field or wrong code", body = Error),
        (status = 404, description = "No such user", body = Error)
    ),
    tags = ["auth"],
    operation_id = "obtainToken",
    security([])
)]
#[post("/auth/token")]
pub async fn obtain_token(
    state: web::Data<HttpState>,
    payload: web::Json<TokenBody>,
) -> ApiResult<web::Json<TokenResponse>> {
    let TokenBody {
        username,
        confirmation_code,
    } = payload.into_inner();
    let request = TokenRequest::try_from_parts(&username, &confirmation_code)?;
    let token = state.credentials.obtain_token(request).await?;
    Ok(web::Json(TokenResponse {
        token: token.expose().to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::{Value, json};

    async fn post(harness: &TestHarness, uri: &str, body: Value) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new().app_data(web::Data::new(harness.state())).service(
                web::scope("/api/v1")
                    .service(sign_up)
                    .service(obtain_token),
            ),
        )
        .await;
        let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
        let res = test::call_service(&app, req).await;
        let status = res.status();
        (status, test::read_body_json(res).await)
    }

    #[actix_web::test]
    async fn sign_up_echoes_the_pair_and_mails_a_code() {
        let harness = TestHarness::new();
        let (status, body) = post(
            &harness,
            "/api/v1/auth/signup",
            json!({"username": "ada", "email": "ada@example.com"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"username": "ada", "email": "ada@example.com"}));
        assert!(harness.notifications.last_code_for("ada@example.com").is_some());
    }

    #[rstest]
    #[case("ada@example.com")]
    #[case("not-an-email")]
    #[actix_web::test]
    async fn reserved_username_is_rejected_whatever_the_email(#[case] email: &str) {
        let harness = TestHarness::new();
        let (status, body) = post(
            &harness,
            "/api/v1/auth/signup",
            json!({"username": "me", "email": email}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "username");
        assert_eq!(harness.store.user_count(), 0);
    }

    #[actix_web::test]
    async fn code_exchanges_for_a_token() {
        let harness = TestHarness::new();
        post(
            &harness,
            "/api/v1/auth/signup",
            json!({"username": "ada", "email": "ada@example.com"}),
        )
        .await;
        let code = harness
            .notifications
            .last_code_for("ada@example.com")
            .expect("code mailed");

        let (status, body) = post(
            &harness,
            "/api/v1/auth/token",
            json!({"username": "ada", "confirmation_code": code}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    }

    #[rstest]
    #[case(json!({"username": "ada", "confirmation_code": "WRONGCODE000"}), StatusCode::BAD_REQUEST)]
    #[case(json!({"username": "ghost", "confirmation_code": "CODE00000001"}), StatusCode::NOT_FOUND)]
    #[case(json!({"username": "ada"}), StatusCode::BAD_REQUEST)]
    #[actix_web::test]
    async fn bad_exchanges_mint_nothing(#[case] body: Value, #[case] expected: StatusCode) {
        let harness = TestHarness::new();
        harness.seed_user("ada", crate::domain::Role::User);

        let (status, response) = post(&harness, "/api/v1/auth/token", body).await;

        assert_eq!(status, expected);
        assert!(response.get("token").is_none());
    }
}
