//! Catalogue values: categories, genres and titles.
//!
//! Categories and genres share one shape, a [`Label`] addressed by its
//! [`Slug`]; [`LabelKind`] tells them apart.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::rating::{Rating, ScoreTally};

/// Maximum slug length.
pub const SLUG_MAX: usize = 50;
/// Maximum length for label and title names.
pub const NAME_MAX: usize = 256;

/// Validation failures for catalogue values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogueValidationError {
    #[error("slug must not be empty")]
    EmptySlug,
    #[error("slug must be at most {max} characters")]
    SlugTooLong { max: usize },
    #[error("slug may only contain letters, digits, hyphens and underscores")]
    SlugInvalidCharacters,
    #[error("name must not be blank")]
    EmptyName,
    #[error("name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("year {year} is in the future (current year is {current})")]
    YearInFuture { year: i32, current: i32 },
}

impl CatalogueValidationError {
    /// Request field the failure belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptySlug | Self::SlugTooLong { .. } | Self::SlugInvalidCharacters => "slug",
            Self::EmptyName | Self::NameTooLong { .. } => "name",
            Self::YearInFuture { .. } => "year",
        }
    }

    /// Machine-readable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptySlug | Self::SlugTooLong { .. } | Self::SlugInvalidCharacters => {
                "invalid_slug"
            }
            Self::EmptyName | Self::NameTooLong { .. } => "invalid_name",
            Self::YearInFuture { .. } => "invalid_year",
        }
    }
}

impl From<CatalogueValidationError> for Error {
    fn from(err: CatalogueValidationError) -> Self {
        Error::invalid_field(err.field(), err.code(), err.to_string())
    }
}

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_regex() -> &'static Regex {
    SLUG_RE.get_or_init(|| {
        Regex::new("^[-a-zA-Z0-9_]+$")
            .unwrap_or_else(|error| panic!("slug regex failed to compile: {error}"))
    })
}

/// External identifier of a category or genre.
///
/// # Examples
/// ```
/// use critique::domain::catalogue::Slug;
///
/// assert!(Slug::new("sci-fi").is_ok());
/// assert!(Slug::new("sci fi").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate a slug.
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogueValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CatalogueValidationError::EmptySlug);
        }
        if value.chars().count() > SLUG_MAX {
            return Err(CatalogueValidationError::SlugTooLong { max: SLUG_MAX });
        }
        if !slug_regex().is_match(&value) {
            return Err(CatalogueValidationError::SlugInvalidCharacters);
        }
        Ok(Self(value))
    }

    /// Borrow the slug.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

impl TryFrom<String> for Slug {
    type Error = CatalogueValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Display name of a label or title: non-blank, at most [`NAME_MAX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogueName(String);

impl CatalogueName {
    /// Validate a name.
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogueValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CatalogueValidationError::EmptyName);
        }
        if value.chars().count() > NAME_MAX {
            return Err(CatalogueValidationError::NameTooLong { max: NAME_MAX });
        }
        Ok(Self(value))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Categories and genres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Category,
    Genre,
}

impl LabelKind {
    /// Singular noun used in messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Genre => "genre",
        }
    }
}

/// A category or genre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: CatalogueName,
    pub slug: Slug,
}

/// Surrogate key of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(i64);

impl TitleId {
    /// Wrap a raw key.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw key for persistence.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Release year, checked against the current calendar year on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleYear(i32);

impl TitleYear {
    /// Validate `year` against `current_year`.
    ///
    /// # Examples
    /// ```
    /// use critique::domain::catalogue::TitleYear;
    ///
    /// assert!(TitleYear::new(1999, 2026).is_ok());
    /// assert!(TitleYear::new(2027, 2026).is_err());
    /// ```
    pub fn new(year: i32, current_year: i32) -> Result<Self, CatalogueValidationError> {
        if year > current_year {
            return Err(CatalogueValidationError::YearInFuture {
                year,
                current: current_year,
            });
        }
        Ok(Self(year))
    }

    /// Rehydrate a stored year without re-checking it.
    pub const fn from_stored(year: i32) -> Self {
        Self(year)
    }

    /// Raw year.
    pub const fn get(self) -> i32 {
        self.0
    }
}

/// Title fields as persisted, with label references by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDraft {
    pub name: CatalogueName,
    pub year: TitleYear,
    pub description: Option<String>,
    pub category: Option<Slug>,
    pub genres: Vec<Slug>,
}

/// Listing filters; every field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFilter {
    /// Case-insensitive substring of the title name.
    pub name: Option<String>,
    pub year: Option<i32>,
    pub category: Option<Slug>,
    pub genre: Option<Slug>,
}

/// Title as loaded from storage, with its score tally.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleRecord {
    pub id: TitleId,
    pub name: CatalogueName,
    pub year: TitleYear,
    pub description: Option<String>,
    pub category: Option<Label>,
    pub genres: Vec<Label>,
    pub tally: ScoreTally,
}

impl TitleRecord {
    /// Draft reproducing this record, used as the base for patches.
    pub fn to_draft(&self) -> TitleDraft {
        TitleDraft {
            name: self.name.clone(),
            year: self.year,
            description: self.description.clone(),
            category: self.category.as_ref().map(|label| label.slug.clone()),
            genres: self.genres.iter().map(|label| label.slug.clone()).collect(),
        }
    }
}

/// Title read model with its rating.
#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub id: TitleId,
    pub name: CatalogueName,
    pub year: TitleYear,
    pub description: Option<String>,
    pub category: Option<Label>,
    pub genres: Vec<Label>,
    pub rating: Option<Rating>,
}

impl From<TitleRecord> for Title {
    fn from(record: TitleRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            year: record.year,
            description: record.description,
            category: record.category,
            genres: record.genres,
            rating: Rating::from_tally(record.tally),
        }
    }
}
