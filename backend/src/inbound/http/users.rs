//! Account endpoints: the admin directory and the caller's own profile.
//!
//! ```text
//! GET   /api/v1/users/me
//! PATCH /api/v1/users/me {"bio":"Reads everything twice"}
//! GET   /api/v1/users?search=ada
//! POST  /api/v1/users {"username":"grace","email":"grace@example.com","role":"moderator"}
//! ```
//!
//! `/users/me` is registered ahead of `/users/{username}`; "me" can never be
//! a username, so the two routes never compete.

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::user_directory::{AccountChanges, NewAccountInput};
use crate::domain::{Error, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::pagination::{PageDto, PageQuery};
use crate::inbound::http::state::HttpState;

/// Account as returned by every user endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    #[schema(example = "user")]
    pub role: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            username: user.username.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            first_name: user.first_name.as_str().to_owned(),
            last_name: user.last_name.as_str().to_owned(),
            bio: user.bio,
            role: user.role.as_str().to_owned(),
        }
    }
}

/// Admin account creation body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct NewUserBody {
    pub username: String,
    pub email: String,
    #[schema(example = "moderator")]
    pub role: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<NewUserBody> for NewAccountInput {
    fn from(body: NewUserBody) -> Self {
        Self {
            username: body.username,
            email: body.email,
            role: body.role,
            bio: body.bio,
            first_name: body.first_name,
            last_name: body.last_name,
        }
    }
}

/// Partial account update. A `username` key is accepted and ignored.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UserPatchBody {
    pub email: Option<String>,
    /// Only honoured on `/users/{username}`.
    pub role: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<UserPatchBody> for AccountChanges {
    fn from(body: UserPatchBody) -> Self {
        Self {
            email: body.email,
            role: body.role,
            bio: body.bio,
            first_name: body.first_name,
            last_name: body.last_name,
        }
    }
}

/// Directory search.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearch {
    /// Exact username.
    pub search: Option<String>,
}

/// The caller's own account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Own account", body = UserDto),
        (status = 401, description = "Not authenticated", body = Error)
    ),
    tags = ["users"],
    operation_id = "getMe"
)]
#[get("/users/me")]
pub async fn get_me(state: web::Data<HttpState>, caller: Caller) -> ApiResult<web::Json<UserDto>> {
    let user = state.users.me(caller.requester()).await?;
    Ok(web::Json(user.into()))
}

/// Edit the caller's own profile. The role never changes here.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UserPatchBody,
    responses(
        (status = 200, description = "Updated account", body = UserDto),
        (status = 400, description = "Invalid field", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 409, description = "Email already in use", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateMe"
)]
#[patch("/users/me")]
pub async fn update_me(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<UserPatchBody>,
) -> ApiResult<web::Json<UserDto>> {
    let user = state
        .users
        .update_me(caller.requester(), payload.into_inner().into())
        .await?;
    Ok(web::Json(user.into()))
}

/// List accounts, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserSearch, PageQuery),
    responses(
        (status = 200, description = "Accounts", body = PageDto<UserDto>),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "Admins only", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    req: HttpRequest,
    state: web::Data<HttpState>,
    caller: Caller,
    search: web::Query<UserSearch>,
    page: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageDto<UserDto>>> {
    let request = page.into_inner().to_request()?;
    let users = state
        .users
        .list(caller.requester(), search.into_inner().search, request)
        .await?;
    Ok(web::Json(PageDto::from_domain(&req, request, users, UserDto::from)))
}

/// Create an account on someone's behalf.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = NewUserBody,
    responses(
        (status = 201, description = "Account created", body = UserDto),
        (status = 400, description = "Invalid field", body = Error),
        (status = 403, description = "Admins only", body = Error),
        (status = 409, description = "Username or email taken", body = Error)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<NewUserBody>,
) -> ApiResult<HttpResponse> {
    let user = state
        .users
        .create(caller.requester(), payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(UserDto::from(user)))
}

/// Fetch one account.
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 200, description = "Account", body = UserDto),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such account", body = Error)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{username}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserDto>> {
    let user = state.users.get(caller.requester(), &path).await?;
    Ok(web::Json(user.into()))
}

/// Change any account, including its role.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    request_body = UserPatchBody,
    responses(
        (status = 200, description = "Updated account", body = UserDto),
        (status = 400, description = "Invalid field", body = Error),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such account", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/users/{username}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<UserPatchBody>,
) -> ApiResult<web::Json<UserDto>> {
    let user = state
        .users
        .update(caller.requester(), &path, payload.into_inner().into())
        .await?;
    Ok(web::Json(user.into()))
}

/// Delete an account with everything it authored.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such account", body = Error)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{username}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state.users.delete(caller.requester(), &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register the account routes, self profile first.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_me)
        .service(update_me)
        .service(list_users)
        .service(create_user)
        .service(get_user)
        .service(update_user)
        .service(delete_user);
}
