//! Review and comment use cases.
//!
//! Every write is gated by [`authorize`]: any member may create, only the
//! author or a moderator/admin may change or remove. One review per
//! (title, author) is checked before insert and again by the store.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::domain::access::{Operation, Requester, Resource, authorize};
use crate::domain::catalogue::TitleId;
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{CatalogueRepository, ReviewRepository, ReviewRepositoryError};
use crate::domain::reviews::{
    Body, Comment, CommentId, NewComment, NewReview, Review, ReviewId, Score,
};
use crate::domain::{Error, UserId};

/// Submitted review fields before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInput {
    pub text: String,
    pub score: i64,
}

/// Submitted review changes before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewChanges {
    pub text: Option<String>,
    pub score: Option<i64>,
}

/// Review ledger use case.
pub struct ReviewLedgerService<R: ?Sized, C: ?Sized> {
    reviews: Arc<R>,
    catalogue: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<R: ?Sized, C: ?Sized> ReviewLedgerService<R, C> {
    /// Create the service.
    pub fn new(reviews: Arc<R>, catalogue: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            reviews,
            catalogue,
            clock,
        }
    }
}

impl<R, C> ReviewLedgerService<R, C>
where
    R: ReviewRepository + ?Sized,
    C: CatalogueRepository + ?Sized,
{
    async fn require_title(&self, title_id: TitleId) -> Result<(), Error> {
        match self.catalogue.find_title(title_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("title {title_id} not found"))),
        }
    }

    async fn require_review(&self, title_id: TitleId, review_id: ReviewId) -> Result<Review, Error> {
        self.reviews
            .find_review(title_id, review_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("review {review_id} not found")))
    }

    async fn require_comment(
        &self,
        title_id: TitleId,
        review_id: ReviewId,
        comment_id: CommentId,
    ) -> Result<Comment, Error> {
        self.require_review(title_id, review_id).await?;
        self.reviews
            .find_comment(review_id, comment_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("comment {comment_id} not found")))
    }

    /// Publish a review. Fails with a conflict if the requester already
    /// reviewed the title.
    pub async fn create_review(
        &self,
        requester: &Requester,
        title_id: TitleId,
        input: ReviewInput,
    ) -> Result<Review, Error> {
        authorize(requester, Operation::Create, Resource::Authored { owner: None })
            .into_result()?;
        let author = authenticated_id(requester)?;
        self.require_title(title_id).await?;
        let score = Score::new(input.score)?;
        let text = Body::new(input.text)?;

        if self.reviews.has_review_by(title_id, author).await? {
            return Err(Error::from(ReviewRepositoryError::duplicate_review()));
        }
        let review = self
            .reviews
            .insert_review(&NewReview {
                title_id,
                author,
                text,
                score,
                pub_date: self.clock.utc(),
            })
            .await?;
        info!(title_id = %title_id, review_id = %review.id, author = %author, "review published");
        Ok(review)
    }

    /// Edit text and/or score. Author, title and publication date stay put.
    pub async fn update_review(
        &self,
        requester: &Requester,
        title_id: TitleId,
        review_id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, Error> {
        let mut review = self.require_review(title_id, review_id).await?;
        authorize(
            requester,
            Operation::Update,
            Resource::Authored {
                owner: Some(review.author),
            },
        )
        .into_result()?;
        if let Some(score) = changes.score {
            review.score = Score::new(score)?;
        }
        if let Some(text) = changes.text {
            review.text = Body::new(text)?;
        }
        self.reviews.update_review(&review).await?;
        Ok(review)
    }

    /// Remove a review and its comments.
    pub async fn delete_review(
        &self,
        requester: &Requester,
        title_id: TitleId,
        review_id: ReviewId,
    ) -> Result<(), Error> {
        let review = self.require_review(title_id, review_id).await?;
        authorize(
            requester,
            Operation::Delete,
            Resource::Authored {
                owner: Some(review.author),
            },
        )
        .into_result()?;
        if !self.reviews.delete_review(review_id).await? {
            return Err(Error::not_found(format!("review {review_id} not found")));
        }
        info!(title_id = %title_id, review_id = %review_id, "review deleted");
        Ok(())
    }

    /// Fetch one review.
    pub async fn get_review(&self, title_id: TitleId, review_id: ReviewId) -> Result<Review, Error> {
        self.require_review(title_id, review_id).await
    }

    /// List a title's reviews oldest first.
    pub async fn list_reviews(
        &self,
        title_id: TitleId,
        page: PageRequest,
    ) -> Result<Page<Review>, Error> {
        self.require_title(title_id).await?;
        Ok(self.reviews.list_reviews(title_id, page).await?)
    }

    /// Comment on a review.
    pub async fn add_comment(
        &self,
        requester: &Requester,
        title_id: TitleId,
        review_id: ReviewId,
        text: String,
    ) -> Result<Comment, Error> {
        authorize(requester, Operation::Create, Resource::Authored { owner: None })
            .into_result()?;
        let author = authenticated_id(requester)?;
        self.require_review(title_id, review_id).await?;
        let text = Body::new(text)?;
        let comment = self
            .reviews
            .insert_comment(&NewComment {
                review_id,
                author,
                text,
                pub_date: self.clock.utc(),
            })
            .await?;
        info!(review_id = %review_id, comment_id = %comment.id, "comment published");
        Ok(comment)
    }

    /// Edit a comment's text.
    pub async fn update_comment(
        &self,
        requester: &Requester,
        title_id: TitleId,
        review_id: ReviewId,
        comment_id: CommentId,
        text: Option<String>,
    ) -> Result<Comment, Error> {
        let mut comment = self.require_comment(title_id, review_id, comment_id).await?;
        authorize(
            requester,
            Operation::Update,
            Resource::Authored {
                owner: Some(comment.author),
            },
        )
        .into_result()?;
        if let Some(text) = text {
            comment.text = Body::new(text)?;
        }
        self.reviews.update_comment(&comment).await?;
        Ok(comment)
    }

    /// Remove a comment.
    pub async fn delete_comment(
        &self,
        requester: &Requester,
        title_id: TitleId,
        review_id: ReviewId,
        comment_id: CommentId,
    ) -> Result<(), Error> {
        let comment = self.require_comment(title_id, review_id, comment_id).await?;
        authorize(
            requester,
            Operation::Delete,
            Resource::Authored {
                owner: Some(comment.author),
            },
        )
        .into_result()?;
        if !self.reviews.delete_comment(comment_id).await? {
            return Err(Error::not_found(format!("comment {comment_id} not found")));
        }
        Ok(())
    }

    /// Fetch one comment.
    pub async fn get_comment(
        &self,
        title_id: TitleId,
        review_id: ReviewId,
        comment_id: CommentId,
    ) -> Result<Comment, Error> {
        self.require_comment(title_id, review_id, comment_id).await
    }

    /// List a review's comments newest first.
    pub async fn list_comments(
        &self,
        title_id: TitleId,
        review_id: ReviewId,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        self.require_review(title_id, review_id).await?;
        Ok(self.reviews.list_comments(review_id, page).await?)
    }
}

fn authenticated_id(requester: &Requester) -> Result<UserId, Error> {
    requester
        .user_id()
        .ok_or_else(|| Error::unauthorized("authentication credentials were not provided"))
}
