//! Catalogue endpoints: categories, genres and titles.
//!
//! ```text
//! GET    /api/v1/genres?search=dra
//! POST   /api/v1/categories {"name":"Films","slug":"films"}
//! GET    /api/v1/titles?genre=drama&year=1994
//! POST   /api/v1/titles {"name":"Heat","year":1995,"category":"films","genre":["crime"]}
//! PATCH  /api/v1/titles/7 {"category":null}
//! ```
//!
//! Reads are public; writes need an admin token.

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::catalogue::{Label, LabelKind, Slug, Title, TitleFilter, TitleId};
use crate::domain::catalogue_service::{TitleChanges, TitleInput};
use crate::domain::pagination::Page;
use crate::domain::rating::Rating;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::pagination::{PageDto, PageQuery};
use crate::inbound::http::state::HttpState;

/// A category or genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LabelDto {
    #[schema(example = "Drama")]
    pub name: String,
    #[schema(example = "drama")]
    pub slug: String,
}

impl From<Label> for LabelDto {
    fn from(label: Label) -> Self {
        Self {
            name: label.name.as_str().to_owned(),
            slug: label.slug.as_str().to_owned(),
        }
    }
}

/// Label search.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LabelSearch {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
}

/// Title with its labels and current rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TitleDto {
    pub id: i64,
    #[schema(example = "Heat")]
    pub name: String,
    #[schema(example = 1995)]
    pub year: i32,
    /// Mean review score; `null` until the first review.
    #[schema(example = 8.5)]
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<LabelDto>,
    pub category: Option<LabelDto>,
}

impl From<Title> for TitleDto {
    fn from(title: Title) -> Self {
        Self {
            id: title.id.get(),
            name: title.name.as_str().to_owned(),
            year: title.year.get(),
            rating: title.rating.map(Rating::value),
            description: title.description,
            genre: title.genres.into_iter().map(LabelDto::from).collect(),
            category: title.category.map(LabelDto::from),
        }
    }
}

/// Title creation body. Labels are referenced by slug.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TitleBody {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    #[schema(example = "films")]
    pub category: Option<String>,
    #[serde(default)]
    #[schema(example = json!(["crime", "drama"]))]
    pub genre: Vec<String>,
}

impl From<TitleBody> for TitleInput {
    fn from(body: TitleBody) -> Self {
        Self {
            name: body.name,
            year: body.year,
            description: body.description,
            category: body.category,
            genres: body.genre,
        }
    }
}

// Distinguishes an explicit `null` (clear) from an absent key (keep).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial title update. `null` clears `description` or `category`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TitlePatchBody {
    pub name: Option<String>,
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
}

impl From<TitlePatchBody> for TitleChanges {
    fn from(body: TitlePatchBody) -> Self {
        Self {
            name: body.name,
            year: body.year,
            description: body.description,
            category: body.category,
            genres: body.genre,
        }
    }
}

/// Title listing filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleQuery {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    pub year: Option<i32>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slug.
    pub genre: Option<String>,
}

impl TitleQuery {
    /// `None` when a slug filter is malformed and therefore matches nothing.
    fn into_filter(self) -> Option<TitleFilter> {
        let slug = |raw: Option<String>| match raw.filter(|value| !value.is_empty()) {
            None => Some(None),
            Some(value) => Slug::new(value).ok().map(Some),
        };
        Some(TitleFilter {
            name: self.name.filter(|value| !value.trim().is_empty()),
            year: self.year,
            category: slug(self.category)?,
            genre: slug(self.genre)?,
        })
    }
}

async fn list_labels(
    req: &HttpRequest,
    state: &HttpState,
    kind: LabelKind,
    search: LabelSearch,
    page: PageQuery,
) -> ApiResult<web::Json<PageDto<LabelDto>>> {
    let request = page.to_request()?;
    let labels = state
        .catalogue
        .list_labels(kind, search.search, request)
        .await?;
    Ok(web::Json(PageDto::from_domain(req, request, labels, LabelDto::from)))
}

async fn create_label(
    state: &HttpState,
    caller: &Caller,
    kind: LabelKind,
    body: LabelDto,
) -> ApiResult<HttpResponse> {
    let label = state
        .catalogue
        .create_label(caller.requester(), kind, &body.name, &body.slug)
        .await?;
    Ok(HttpResponse::Created().json(LabelDto::from(label)))
}

async fn delete_label(
    state: &HttpState,
    caller: &Caller,
    kind: LabelKind,
    slug: &str,
) -> ApiResult<HttpResponse> {
    state
        .catalogue
        .delete_label(caller.requester(), kind, slug)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List categories by name.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(LabelSearch, PageQuery),
    responses((status = 200, description = "Categories", body = PageDto<LabelDto>)),
    tags = ["catalogue"],
    operation_id = "listCategories",
    security([])
)]
#[get("/categories")]
pub async fn list_categories(
    req: HttpRequest,
    state: web::Data<HttpState>,
    search: web::Query<LabelSearch>,
    page: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageDto<LabelDto>>> {
    list_labels(
        &req,
        &state,
        LabelKind::Category,
        search.into_inner(),
        page.into_inner(),
    )
    .await
}

/// Create a category.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = LabelDto,
    responses(
        (status = 201, description = "Category created", body = LabelDto),
        (status = 400, description = "Invalid name or slug", body = Error),
        (status = 403, description = "Admins only", body = Error),
        (status = 409, description = "Slug taken", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "createCategory"
)]
#[post("/categories")]
pub async fn create_category(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<LabelDto>,
) -> ApiResult<HttpResponse> {
    create_label(&state, &caller, LabelKind::Category, payload.into_inner()).await
}

/// Delete a category; its titles keep existing without one.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such category", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "deleteCategory"
)]
#[delete("/categories/{slug}")]
pub async fn delete_category(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    delete_label(&state, &caller, LabelKind::Category, &path).await
}

/// List genres by name.
#[utoipa::path(
    get,
    path = "/api/v1/genres",
    params(LabelSearch, PageQuery),
    responses((status = 200, description = "Genres", body = PageDto<LabelDto>)),
    tags = ["catalogue"],
    operation_id = "listGenres",
    security([])
)]
#[get("/genres")]
pub async fn list_genres(
    req: HttpRequest,
    state: web::Data<HttpState>,
    search: web::Query<LabelSearch>,
    page: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageDto<LabelDto>>> {
    list_labels(
        &req,
        &state,
        LabelKind::Genre,
        search.into_inner(),
        page.into_inner(),
    )
    .await
}

/// Create a genre.
#[utoipa::path(
    post,
    path = "/api/v1/genres",
    request_body = LabelDto,
    responses(
        (status = 201, description = "Genre created", body = LabelDto),
        (status = 400, description = "Invalid name or slug", body = Error),
        (status = 403, description = "Admins only", body = Error),
        (status = 409, description = "Slug taken", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "createGenre"
)]
#[post("/genres")]
pub async fn create_genre(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<LabelDto>,
) -> ApiResult<HttpResponse> {
    create_label(&state, &caller, LabelKind::Genre, payload.into_inner()).await
}

/// Delete a genre; titles simply lose it.
#[utoipa::path(
    delete,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such genre", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "deleteGenre"
)]
#[delete("/genres/{slug}")]
pub async fn delete_genre(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    delete_label(&state, &caller, LabelKind::Genre, &path).await
}

/// List titles with optional filters.
#[utoipa::path(
    get,
    path = "/api/v1/titles",
    params(TitleQuery, PageQuery),
    responses(
        (status = 200, description = "Titles", body = PageDto<TitleDto>),
        (status = 400, description = "Invalid filter", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "listTitles",
    security([])
)]
#[get("/titles")]
pub async fn list_titles(
    req: HttpRequest,
    state: web::Data<HttpState>,
    query: web::Query<TitleQuery>,
    page: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageDto<TitleDto>>> {
    let request = page.into_inner().to_request()?;
    let titles = match query.into_inner().into_filter() {
        Some(filter) => state.catalogue.list_titles(filter, request).await?,
        None => Page {
            count: 0,
            results: Vec::new(),
        },
    };
    Ok(web::Json(PageDto::from_domain(&req, request, titles, TitleDto::from)))
}

/// Fetch one title.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 200, description = "Title", body = TitleDto),
        (status = 404, description = "No such title", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "getTitle",
    security([])
)]
#[get("/titles/{title_id}")]
pub async fn get_title(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<TitleDto>> {
    let title = state.catalogue.get_title(TitleId::new(*path)).await?;
    Ok(web::Json(title.into()))
}

/// Create a title.
#[utoipa::path(
    post,
    path = "/api/v1/titles",
    request_body = TitleBody,
    responses(
        (status = 201, description = "Title created", body = TitleDto),
        (status = 400, description = "Invalid field or unknown label", body = Error),
        (status = 403, description = "Admins only", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "createTitle"
)]
#[post("/titles")]
pub async fn create_title(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<TitleBody>,
) -> ApiResult<HttpResponse> {
    let title = state
        .catalogue
        .create_title(caller.requester(), payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(TitleDto::from(title)))
}

/// Change a title.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    request_body = TitlePatchBody,
    responses(
        (status = 200, description = "Updated title", body = TitleDto),
        (status = 400, description = "Invalid field or unknown label", body = Error),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such title", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "updateTitle"
)]
#[patch("/titles/{title_id}")]
pub async fn update_title(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<i64>,
    payload: web::Json<TitlePatchBody>,
) -> ApiResult<web::Json<TitleDto>> {
    let title = state
        .catalogue
        .update_title(
            caller.requester(),
            TitleId::new(*path),
            payload.into_inner().into(),
        )
        .await?;
    Ok(web::Json(title.into()))
}

/// Delete a title with its reviews and comments.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only", body = Error),
        (status = 404, description = "No such title", body = Error)
    ),
    tags = ["catalogue"],
    operation_id = "deleteTitle"
)]
#[delete("/titles/{title_id}")]
pub async fn delete_title(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .catalogue
        .delete_title(caller.requester(), TitleId::new(*path))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register the catalogue routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_categories)
        .service(create_category)
        .service(delete_category)
        .service(list_genres)
        .service(create_genre)
        .service(delete_genre)
        .service(list_titles)
        .service(create_title)
        .service(get_title)
        .service(update_title)
        .service(delete_title);
}
