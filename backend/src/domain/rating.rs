//! Read-time title ratings.
//!
//! Ratings are never stored. Repositories return a [`ScoreTally`] from an
//! aggregate query and [`Rating::from_tally`] derives the mean.

use serde::Serialize;

/// Count and sum of review scores for one title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTally {
    pub count: u64,
    pub sum: u64,
}

impl ScoreTally {
    /// Tally a slice of scores.
    pub fn of(scores: impl IntoIterator<Item = u8>) -> Self {
        scores.into_iter().fold(Self::default(), |tally, score| Self {
            count: tally.count + 1,
            sum: tally.sum + u64::from(score),
        })
    }
}

/// Arithmetic mean of a title's review scores.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    /// Mean of the tally; `None` when the title has no reviews.
    ///
    /// # Examples
    /// ```
    /// use critique::domain::rating::{Rating, ScoreTally};
    ///
    /// assert_eq!(Rating::from_tally(ScoreTally::default()), None);
    /// let rating = Rating::from_tally(ScoreTally::of([7, 9])).expect("reviews present");
    /// assert_eq!(rating.value(), 8.0);
    /// ```
    pub fn from_tally(tally: ScoreTally) -> Option<Self> {
        if tally.count == 0 {
            return None;
        }
        // Score sums stay far below 2^53, so both conversions are exact.
        Some(Self(tally.sum as f64 / tally.count as f64))
    }

    /// The mean as a float.
    pub fn value(self) -> f64 {
        self.0
    }
}
