//! Review and comment endpoints nested under a title.
//!
//! ```text
//! GET   /api/v1/titles/7/reviews
//! POST  /api/v1/titles/7/reviews {"text":"Tense throughout","score":9}
//! PATCH /api/v1/titles/7/reviews/3 {"score":8}
//! POST  /api/v1/titles/7/reviews/3/comments {"text":"Agreed"}
//! ```

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::catalogue::TitleId;
use crate::domain::review_ledger::{ReviewChanges, ReviewInput};
use crate::domain::reviews::{Comment, CommentId, Review, ReviewId, ReviewValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::pagination::{PageDto, PageQuery};
use crate::inbound::http::state::HttpState;

/// A published review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReviewDto {
    pub id: i64,
    pub text: String,
    /// Author's username.
    #[schema(example = "ada")]
    pub author: String,
    #[schema(example = 9, minimum = 1, maximum = 10)]
    pub score: u8,
    pub pub_date: DateTime<Utc>,
}

impl From<Review> for ReviewDto {
    fn from(review: Review) -> Self {
        Self {
            id: review.id.get(),
            text: review.text.as_str().to_owned(),
            author: review.author_username.as_str().to_owned(),
            score: review.score.get(),
            pub_date: review.pub_date,
        }
    }
}

/// A comment on a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentDto {
    pub id: i64,
    pub text: String,
    #[schema(example = "grace")]
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Comment> for CommentDto {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id.get(),
            text: comment.text.as_str().to_owned(),
            author: comment.author_username.as_str().to_owned(),
            pub_date: comment.pub_date,
        }
    }
}

/// Review creation body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReviewBody {
    pub text: String,
    /// Any JSON number is accepted here so fractions fail as `invalid_score`.
    #[schema(value_type = i64, example = 9)]
    pub score: Number,
}

/// Partial review update.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ReviewPatchBody {
    pub text: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub score: Option<Number>,
}

/// Whole-number score; fractions and out-of-range magnitudes are rejected.
fn whole_score(raw: &Number) -> Result<i64, Error> {
    raw.as_i64()
        .or_else(|| raw.as_u64().map(|_| i64::MAX))
        .ok_or_else(|| ReviewValidationError::InvalidScore.into())
}

/// Comment creation body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CommentBody {
    pub text: String,
}

/// Partial comment update.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CommentPatchBody {
    pub text: Option<String>,
}

/// List a title's reviews, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title id"), PageQuery),
    responses(
        (status = 200, description = "Reviews", body = PageDto<ReviewDto>),
        (status = 404, description = "No such title", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "listReviews",
    security([])
)]
#[get("/titles/{title_id}/reviews")]
pub async fn list_reviews(
    req: HttpRequest,
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    page: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageDto<ReviewDto>>> {
    let request = page.into_inner().to_request()?;
    let reviews = state
        .reviews
        .list_reviews(TitleId::new(*path), request)
        .await?;
    Ok(web::Json(PageDto::from_domain(&req, request, reviews, ReviewDto::from)))
}

/// Review a title. One review per title and author.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title id")),
    request_body = ReviewBody,
    responses(
        (status = 201, description = "Review published", body = ReviewDto),
        (status = 400, description = "Score outside 1..=10 or empty text", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 404, description = "No such title", body = Error),
        (status = 409, description = "Already reviewed by this author", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "createReview"
)]
#[post("/titles/{title_id}/reviews")]
pub async fn create_review(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<i64>,
    payload: web::Json<ReviewBody>,
) -> ApiResult<HttpResponse> {
    let ReviewBody { text, score } = payload.into_inner();
    let score = whole_score(&score)?;
    let review = state
        .reviews
        .create_review(
            caller.requester(),
            TitleId::new(*path),
            ReviewInput { text, score },
        )
        .await?;
    Ok(HttpResponse::Created().json(ReviewDto::from(review)))
}

/// Fetch one review.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "Review", body = ReviewDto),
        (status = 404, description = "No such review under this title", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "getReview",
    security([])
)]
#[get("/titles/{title_id}/reviews/{review_id}")]
pub async fn get_review(
    state: web::Data<HttpState>,
    path: web::Path<(i64, i64)>,
) -> ApiResult<web::Json<ReviewDto>> {
    let (title_id, review_id) = path.into_inner();
    let review = state
        .reviews
        .get_review(TitleId::new(title_id), ReviewId::new(review_id))
        .await?;
    Ok(web::Json(review.into()))
}

/// Edit a review. Authors, moderators and admins only.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    request_body = ReviewPatchBody,
    responses(
        (status = 200, description = "Updated review", body = ReviewDto),
        (status = 400, description = "Invalid field", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "No such review under this title", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "updateReview"
)]
#[patch("/titles/{title_id}/reviews/{review_id}")]
pub async fn update_review(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
    payload: web::Json<ReviewPatchBody>,
) -> ApiResult<web::Json<ReviewDto>> {
    let (title_id, review_id) = path.into_inner();
    let ReviewPatchBody { text, score } = payload.into_inner();
    let score = score.as_ref().map(whole_score).transpose()?;
    let review = state
        .reviews
        .update_review(
            caller.requester(),
            TitleId::new(title_id),
            ReviewId::new(review_id),
            ReviewChanges { text, score },
        )
        .await?;
    Ok(web::Json(review.into()))
}

/// Delete a review and its comments.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "No such review under this title", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "deleteReview"
)]
#[delete("/titles/{title_id}/reviews/{review_id}")]
pub async fn delete_review(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    state
        .reviews
        .delete_review(
            caller.requester(),
            TitleId::new(title_id),
            ReviewId::new(review_id),
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List a review's comments, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Comments", body = PageDto<CommentDto>),
        (status = 404, description = "No such review under this title", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "listComments",
    security([])
)]
#[get("/titles/{title_id}/reviews/{review_id}/comments")]
pub async fn list_comments(
    req: HttpRequest,
    state: web::Data<HttpState>,
    path: web::Path<(i64, i64)>,
    page: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageDto<CommentDto>>> {
    let (title_id, review_id) = path.into_inner();
    let request = page.into_inner().to_request()?;
    let comments = state
        .reviews
        .list_comments(TitleId::new(title_id), ReviewId::new(review_id), request)
        .await?;
    Ok(web::Json(PageDto::from_domain(&req, request, comments, CommentDto::from)))
}

/// Comment on a review.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id")
    ),
    request_body = CommentBody,
    responses(
        (status = 201, description = "Comment published", body = CommentDto),
        (status = 400, description = "Empty text", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 404, description = "No such review under this title", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "createComment"
)]
#[post("/titles/{title_id}/reviews/{review_id}/comments")]
pub async fn create_comment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
    payload: web::Json<CommentBody>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id) = path.into_inner();
    let comment = state
        .reviews
        .add_comment(
            caller.requester(),
            TitleId::new(title_id),
            ReviewId::new(review_id),
            payload.into_inner().text,
        )
        .await?;
    Ok(HttpResponse::Created().json(CommentDto::from(comment)))
}

/// Fetch one comment.
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment", body = CommentDto),
        (status = 404, description = "No such comment", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "getComment",
    security([])
)]
#[get("/titles/{title_id}/reviews/{review_id}/comments/{comment_id}")]
pub async fn get_comment(
    state: web::Data<HttpState>,
    path: web::Path<(i64, i64, i64)>,
) -> ApiResult<web::Json<CommentDto>> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let comment = state
        .reviews
        .get_comment(
            TitleId::new(title_id),
            ReviewId::new(review_id),
            CommentId::new(comment_id),
        )
        .await?;
    Ok(web::Json(comment.into()))
}

/// Edit a comment. Authors, moderators and admins only.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    request_body = CommentPatchBody,
    responses(
        (status = 200, description = "Updated comment", body = CommentDto),
        (status = 400, description = "Empty text", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "No such comment", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "updateComment"
)]
#[patch("/titles/{title_id}/reviews/{review_id}/comments/{comment_id}")]
pub async fn update_comment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<(i64, i64, i64)>,
    payload: web::Json<CommentPatchBody>,
) -> ApiResult<web::Json<CommentDto>> {
    let (title_id, review_id, comment_id) = path.into_inner();
    let comment = state
        .reviews
        .update_comment(
            caller.requester(),
            TitleId::new(title_id),
            ReviewId::new(review_id),
            CommentId::new(comment_id),
            payload.into_inner().text,
        )
        .await?;
    Ok(web::Json(comment.into()))
}

/// Delete a comment.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title id"),
        ("review_id" = i64, Path, description = "Review id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "No such comment", body = Error)
    ),
    tags = ["reviews"],
    operation_id = "deleteComment"
)]
#[delete("/titles/{title_id}/reviews/{review_id}/comments/{comment_id}")]
pub async fn delete_comment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<(i64, i64, i64)>,
) -> ApiResult<HttpResponse> {
    let (title_id, review_id, comment_id) = path.into_inner();
    state
        .reviews
        .delete_comment(
            caller.requester(),
            TitleId::new(title_id),
            ReviewId::new(review_id),
            CommentId::new(comment_id),
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register the review and comment routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_reviews)
        .service(create_review)
        .service(get_review)
        .service(update_review)
        .service(delete_review)
        .service(list_comments)
        .service(create_comment)
        .service(get_comment)
        .service(update_comment)
        .service(delete_comment);
}
