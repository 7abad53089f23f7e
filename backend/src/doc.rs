//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every handler annotated with `#[utoipa::path]`, the
//! request and response DTOs, and the bearer security scheme. Swagger UI
//! serves it in debug builds and `openapi-dump` prints it for tooling.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::catalogue::{LabelDto, TitleBody, TitleDto, TitlePatchBody};
use crate::inbound::http::health::ProbeStatus;
use crate::inbound::http::reviews::{
    CommentBody, CommentDto, CommentPatchBody, ReviewBody, ReviewDto, ReviewPatchBody,
};
use crate::inbound::http::signup::{SignUpBody, SignUpResponse, TokenBody, TokenResponse};
use crate::inbound::http::users::{NewUserBody, UserDto, UserPatchBody};

/// Name of the bearer scheme referenced by secured operations.
pub const BEARER_SCHEME: &str = "BearerToken";

/// Register the JWT bearer scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token issued by POST /api/v1/auth/token."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Critique API",
        description = "Titles, reviews and comments with passwordless sign-up and role-based access.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = []), ()),
    paths(
        crate::inbound::http::signup::sign_up,
        crate::inbound::http::signup::obtain_token,
        crate::inbound::http::users::get_me,
        crate::inbound::http::users::update_me,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::catalogue::list_categories,
        crate::inbound::http::catalogue::create_category,
        crate::inbound::http::catalogue::delete_category,
        crate::inbound::http::catalogue::list_genres,
        crate::inbound::http::catalogue::create_genre,
        crate::inbound::http::catalogue::delete_genre,
        crate::inbound::http::catalogue::list_titles,
        crate::inbound::http::catalogue::get_title,
        crate::inbound::http::catalogue::create_title,
        crate::inbound::http::catalogue::update_title,
        crate::inbound::http::catalogue::delete_title,
        crate::inbound::http::reviews::list_reviews,
        crate::inbound::http::reviews::create_review,
        crate::inbound::http::reviews::get_review,
        crate::inbound::http::reviews::update_review,
        crate::inbound::http::reviews::delete_review,
        crate::inbound::http::reviews::list_comments,
        crate::inbound::http::reviews::create_comment,
        crate::inbound::http::reviews::get_comment,
        crate::inbound::http::reviews::update_comment,
        crate::inbound::http::reviews::delete_comment,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SignUpBody,
        SignUpResponse,
        TokenBody,
        TokenResponse,
        UserDto,
        NewUserBody,
        UserPatchBody,
        LabelDto,
        TitleDto,
        TitleBody,
        TitlePatchBody,
        ReviewDto,
        ReviewBody,
        ReviewPatchBody,
        CommentDto,
        CommentBody,
        CommentPatchBody,
        ProbeStatus,
    )),
    tags(
        (name = "auth", description = "Sign-up and token exchange"),
        (name = "users", description = "Accounts and the caller's own profile"),
        (name = "catalogue", description = "Categories, genres and titles"),
        (name = "reviews", description = "Reviews and their comments"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
