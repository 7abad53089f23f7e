//! Port for reviews and their comments.
//!
//! The store enforces one review per (title, author). Adapters report the
//! constraint as [`ReviewRepositoryError::DuplicateReview`] so racing creates
//! fail the same way as the service's pre-check.

use async_trait::async_trait;

use crate::domain::catalogue::TitleId;
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::reviews::{Comment, CommentId, NewComment, NewReview, Review, ReviewId};
use crate::domain::{Error, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by review repository adapters.
    pub enum ReviewRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "review repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "review repository query failed: {message}",
        /// The author already reviewed this title.
        DuplicateReview =>
            "this author has already reviewed the title",
        /// The referenced title, review or author vanished mid-write.
        MissingParent { message: String } =>
            "referenced row is missing: {message}",
    }
}

/// Review and comment storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Fetch a review scoped to its title.
    async fn find_review(
        &self,
        title_id: TitleId,
        review_id: ReviewId,
    ) -> Result<Option<Review>, ReviewRepositoryError>;

    /// Whether `author` already reviewed `title_id`.
    async fn has_review_by(
        &self,
        title_id: TitleId,
        author: UserId,
    ) -> Result<bool, ReviewRepositoryError>;

    /// Insert a review.
    async fn insert_review(&self, review: &NewReview) -> Result<Review, ReviewRepositoryError>;

    /// Persist new text and score for an existing review.
    async fn update_review(&self, review: &Review) -> Result<(), ReviewRepositoryError>;

    /// Delete a review and its comments.
    async fn delete_review(&self, review_id: ReviewId) -> Result<bool, ReviewRepositoryError>;

    /// List a title's reviews oldest first.
    async fn list_reviews(
        &self,
        title_id: TitleId,
        page: PageRequest,
    ) -> Result<Page<Review>, ReviewRepositoryError>;

    /// Fetch a comment scoped to its review.
    async fn find_comment(
        &self,
        review_id: ReviewId,
        comment_id: CommentId,
    ) -> Result<Option<Comment>, ReviewRepositoryError>;

    /// Insert a comment.
    async fn insert_comment(&self, comment: &NewComment)
    -> Result<Comment, ReviewRepositoryError>;

    /// Persist new text for an existing comment.
    async fn update_comment(&self, comment: &Comment) -> Result<(), ReviewRepositoryError>;

    /// Delete a comment.
    async fn delete_comment(&self, comment_id: CommentId) -> Result<bool, ReviewRepositoryError>;

    /// List a review's comments newest first.
    async fn list_comments(
        &self,
        review_id: ReviewId,
        page: PageRequest,
    ) -> Result<Page<Comment>, ReviewRepositoryError>;
}

impl From<ReviewRepositoryError> for Error {
    fn from(err: ReviewRepositoryError) -> Self {
        match err {
            ReviewRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("review repository unavailable: {message}"))
            }
            ReviewRepositoryError::Query { message } => {
                Error::internal(format!("review repository error: {message}"))
            }
            ReviewRepositoryError::DuplicateReview => {
                Error::conflict("you have already reviewed this title")
                    .with_details(serde_json::json!({ "code": "duplicate_review" }))
            }
            ReviewRepositoryError::MissingParent { message } => Error::not_found(message),
        }
    }
}
