//! PostgreSQL-backed review and comment ledger.
//!
//! `reviews_title_author_key` enforces one review per author per title; its
//! violation maps to [`ReviewRepositoryError::DuplicateReview`]. Foreign-key
//! failures (title or review deleted mid-request) map to `MissingParent`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::catalogue::TitleId;
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{ReviewRepository, ReviewRepositoryError};
use crate::domain::reviews::{
    Body, Comment, CommentId, NewComment, NewReview, Review, ReviewId, Score,
};
use crate::domain::{UserId, Username};

use super::diesel_error_mapping::{DieselFailure, classify, page_bounds, pool_message, row_count};
use super::models::{CommentRow, NewCommentRow, NewReviewRow, ReviewRow};
use super::pool::{DbPool, PoolError};
use super::schema::{comments, reviews, users};

/// Diesel implementation of the review ledger port.
#[derive(Clone)]
pub struct DieselReviewRepository {
    pool: DbPool,
}

impl DieselReviewRepository {
    /// Create a repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ReviewRepositoryError {
    ReviewRepositoryError::connection(pool_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> ReviewRepositoryError {
    match classify(error) {
        DieselFailure::Unique { .. } => ReviewRepositoryError::duplicate_review(),
        DieselFailure::ForeignKey { message } => ReviewRepositoryError::missing_parent(message),
        DieselFailure::Connection { message } => ReviewRepositoryError::connection(message),
        DieselFailure::Query { message } => ReviewRepositoryError::query(message),
    }
}

fn corrupt(what: &str, id: i64, err: impl std::fmt::Display) -> ReviewRepositoryError {
    ReviewRepositoryError::query(format!("invalid {what} row {id}: {err}"))
}

fn to_review(row: ReviewRow, username: String) -> Result<Review, ReviewRepositoryError> {
    Ok(Review {
        id: ReviewId::new(row.id),
        title_id: TitleId::new(row.title_id),
        author: UserId::from_uuid(row.author_id),
        author_username: Username::new(username).map_err(|err| corrupt("review", row.id, err))?,
        text: Body::new(row.text).map_err(|err| corrupt("review", row.id, err))?,
        score: Score::new(row.score).map_err(|err| corrupt("review", row.id, err))?,
        pub_date: row.pub_date,
    })
}

fn to_comment(row: CommentRow, username: String) -> Result<Comment, ReviewRepositoryError> {
    Ok(Comment {
        id: CommentId::new(row.id),
        review_id: ReviewId::new(row.review_id),
        author: UserId::from_uuid(row.author_id),
        author_username: Username::new(username)
            .map_err(|err| corrupt("comment", row.id, err))?,
        text: Body::new(row.text).map_err(|err| corrupt("comment", row.id, err))?,
        pub_date: row.pub_date,
    })
}

fn collect<T, R>(
    rows: Vec<(R, String)>,
    convert: fn(R, String) -> Result<T, ReviewRepositoryError>,
) -> Result<Vec<T>, ReviewRepositoryError> {
    rows.into_iter()
        .map(|(row, username)| convert(row, username))
        .collect()
}

#[async_trait]
impl ReviewRepository for DieselReviewRepository {
    async fn find_review(
        &self,
        title_id: TitleId,
        review_id: ReviewId,
    ) -> Result<Option<Review>, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<(ReviewRow, String)> = reviews::table
            .inner_join(users::table)
            .filter(reviews::id.eq(review_id.get()))
            .filter(reviews::title_id.eq(title_id.get()))
            .select((ReviewRow::as_select(), users::username))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|(row, username)| to_review(row, username))
            .transpose()
    }

    async fn has_review_by(
        &self,
        title_id: TitleId,
        author: UserId,
    ) -> Result<bool, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(
            reviews::table
                .filter(reviews::title_id.eq(title_id.get()))
                .filter(reviews::author_id.eq(*author.as_uuid())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Review, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: ReviewRow = diesel::insert_into(reviews::table)
            .values(&NewReviewRow {
                title_id: review.title_id.get(),
                author_id: *review.author.as_uuid(),
                text: review.text.as_str(),
                score: i16::from(review.score.get()),
                pub_date: review.pub_date,
            })
            .returning(ReviewRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let username: String = users::table
            .find(row.author_id)
            .select(users::username)
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_review(row, username)
    }

    async fn update_review(&self, review: &Review) -> Result<(), ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(reviews::table.find(review.id.get()))
            .set((
                reviews::text.eq(review.text.as_str()),
                reviews::score.eq(i16::from(review.score.get())),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<bool, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(reviews::table.find(review_id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn list_reviews(
        &self,
        title_id: TitleId,
        page: PageRequest,
    ) -> Result<Page<Review>, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = reviews::table
            .filter(reviews::title_id.eq(title_id.get()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let (limit, offset) = page_bounds(page.limit(), page.offset());
        let rows: Vec<(ReviewRow, String)> = reviews::table
            .inner_join(users::table)
            .filter(reviews::title_id.eq(title_id.get()))
            .order_by((reviews::pub_date.asc(), reviews::id.asc()))
            .select((ReviewRow::as_select(), users::username))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(Page {
            count: row_count(count),
            results: collect(rows, to_review)?,
        })
    }

    async fn find_comment(
        &self,
        review_id: ReviewId,
        comment_id: CommentId,
    ) -> Result<Option<Comment>, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<(CommentRow, String)> = comments::table
            .inner_join(users::table)
            .filter(comments::id.eq(comment_id.get()))
            .filter(comments::review_id.eq(review_id.get()))
            .select((CommentRow::as_select(), users::username))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|(row, username)| to_comment(row, username))
            .transpose()
    }

    async fn insert_comment(
        &self,
        comment: &NewComment,
    ) -> Result<Comment, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: CommentRow = diesel::insert_into(comments::table)
            .values(&NewCommentRow {
                review_id: comment.review_id.get(),
                author_id: *comment.author.as_uuid(),
                text: comment.text.as_str(),
                pub_date: comment.pub_date,
            })
            .returning(CommentRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let username: String = users::table
            .find(row.author_id)
            .select(users::username)
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_comment(row, username)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(comments::table.find(comment.id.get()))
            .set(comments::text.eq(comment.text.as_str()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete_comment(&self, comment_id: CommentId) -> Result<bool, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(comments::table.find(comment_id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn list_comments(
        &self,
        review_id: ReviewId,
        page: PageRequest,
    ) -> Result<Page<Comment>, ReviewRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = comments::table
            .filter(comments::review_id.eq(review_id.get()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let (limit, offset) = page_bounds(page.limit(), page.offset());
        let rows: Vec<(CommentRow, String)> = comments::table
            .inner_join(users::table)
            .filter(comments::review_id.eq(review_id.get()))
            .order_by((comments::pub_date.desc(), comments::id.desc()))
            .select((CommentRow::as_select(), users::username))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(Page {
            count: row_count(count),
            results: collect(rows, to_comment)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new("constraint".to_owned()))
    }

    #[rstest]
    fn unique_violations_are_duplicate_reviews() {
        assert_eq!(
            map_diesel_error(database_error(DatabaseErrorKind::UniqueViolation)),
            ReviewRepositoryError::DuplicateReview
        );
    }

    #[rstest]
    fn foreign_key_violations_are_missing_parents() {
        assert!(matches!(
            map_diesel_error(database_error(DatabaseErrorKind::ForeignKeyViolation)),
            ReviewRepositoryError::MissingParent { .. }
        ));
    }

    #[rstest]
    fn out_of_range_scores_in_rows_are_query_errors() {
        let row = ReviewRow {
            id: 4,
            title_id: 1,
            author_id: uuid::Uuid::new_v4(),
            text: "Fine".to_owned(),
            score: 11,
            pub_date: chrono::Utc::now(),
        };
        let err = to_review(row, "ada".to_owned()).expect_err("score out of range");
        assert!(matches!(err, ReviewRepositoryError::Query { .. }));
    }
}
