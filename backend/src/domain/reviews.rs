//! Reviews, comments and their validated fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::catalogue::TitleId;
use crate::domain::{Error, UserId, Username};

/// Lowest accepted score.
pub const SCORE_MIN: u8 = 1;
/// Highest accepted score.
pub const SCORE_MAX: u8 = 10;

/// Validation failures for review and comment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReviewValidationError {
    #[error("score must be between {SCORE_MIN} and {SCORE_MAX}")]
    InvalidScore,
    #[error("text must not be blank")]
    EmptyText,
}

impl From<ReviewValidationError> for Error {
    fn from(err: ReviewValidationError) -> Self {
        let (field, code) = match err {
            ReviewValidationError::InvalidScore => ("score", "invalid_score"),
            ReviewValidationError::EmptyText => ("text", "empty_text"),
        };
        Error::invalid_field(field, code, err.to_string())
    }
}

/// Review score in `[1, 10]`.
///
/// # Examples
/// ```
/// use critique::domain::reviews::Score;
///
/// assert!(Score::new(10).is_ok());
/// assert!(Score::new(11).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    /// Validate a submitted score. Accepts any integer width so out-of-range
    /// values like `-1` or `300` are rejected instead of wrapping.
    pub fn new(value: impl Into<i64>) -> Result<Self, ReviewValidationError> {
        let value = value.into();
        u8::try_from(value)
            .ok()
            .filter(|score| (SCORE_MIN..=SCORE_MAX).contains(score))
            .map(Self)
            .ok_or(ReviewValidationError::InvalidScore)
    }

    /// Raw score.
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Non-blank review or comment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body(String);

impl Body {
    /// Validate a body.
    pub fn new(value: impl Into<String>) -> Result<Self, ReviewValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ReviewValidationError::EmptyText);
        }
        Ok(Self(value))
    }

    /// Borrow the text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw key.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Raw key for persistence.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Surrogate key of a review.
    ReviewId
);
surrogate_id!(
    /// Surrogate key of a comment.
    CommentId
);

/// Stored review.
///
/// ## Invariants
/// - At most one review per (`title_id`, `author`).
/// - `author`, `title_id` and `pub_date` never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub title_id: TitleId,
    pub author: UserId,
    pub author_username: Username,
    pub text: Body,
    pub score: Score,
    pub pub_date: DateTime<Utc>,
}

/// Review about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub title_id: TitleId,
    pub author: UserId,
    pub text: Body,
    pub score: Score,
    pub pub_date: DateTime<Utc>,
}

/// Stored comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub review_id: ReviewId,
    pub author: UserId,
    pub author_username: Username,
    pub text: Body,
    pub pub_date: DateTime<Utc>,
}

/// Comment about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub review_id: ReviewId,
    pub author: UserId,
    pub text: Body,
    pub pub_date: DateTime<Utc>,
}
