//! Port for categories, genres and titles.
//!
//! Title reads return a [`TitleRecord`] carrying a fresh [`ScoreTally`] from
//! an aggregate over the title's reviews; no rating is ever stored.
//!
//! [`ScoreTally`]: crate::domain::rating::ScoreTally

use async_trait::async_trait;

use crate::domain::catalogue::{Label, LabelKind, Slug, TitleDraft, TitleFilter, TitleId, TitleRecord};
use crate::domain::Error;
use crate::domain::pagination::{Page, PageRequest};

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue repository adapters.
    pub enum CatalogueRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "catalogue repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "catalogue repository query failed: {message}",
        /// The slug is already used by another label of the same kind.
        DuplicateSlug { slug: String } =>
            "slug {slug} is already in use",
        /// A title referenced a label that does not exist.
        UnknownLabel { slug: String } =>
            "no category or genre with slug {slug}",
    }
}

/// Catalogue storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    /// List labels ordered by name, optionally filtered by a case-insensitive
    /// substring of the name.
    async fn list_labels(
        &self,
        kind: LabelKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Label>, CatalogueRepositoryError>;

    /// Fetch one label by slug.
    async fn find_label(
        &self,
        kind: LabelKind,
        slug: &Slug,
    ) -> Result<Option<Label>, CatalogueRepositoryError>;

    /// Insert a label.
    async fn insert_label(
        &self,
        kind: LabelKind,
        label: &Label,
    ) -> Result<(), CatalogueRepositoryError>;

    /// Delete a label. Categories detach from their titles; genres drop their
    /// title links. Returns `false` when no row matched.
    async fn delete_label(
        &self,
        kind: LabelKind,
        slug: &Slug,
    ) -> Result<bool, CatalogueRepositoryError>;

    /// List titles ordered by name.
    async fn list_titles(
        &self,
        filter: TitleFilter,
        page: PageRequest,
    ) -> Result<Page<TitleRecord>, CatalogueRepositoryError>;

    /// Fetch one title.
    async fn find_title(&self, id: TitleId) -> Result<Option<TitleRecord>, CatalogueRepositoryError>;

    /// Insert a title with its genre links, returning the new key.
    async fn insert_title(&self, draft: &TitleDraft) -> Result<TitleId, CatalogueRepositoryError>;

    /// Replace a title's fields and genre links. Returns `false` when no row
    /// matched.
    async fn update_title(
        &self,
        id: TitleId,
        draft: &TitleDraft,
    ) -> Result<bool, CatalogueRepositoryError>;

    /// Delete a title and, through cascades, its reviews and comments.
    async fn delete_title(&self, id: TitleId) -> Result<bool, CatalogueRepositoryError>;
}

impl From<CatalogueRepositoryError> for Error {
    fn from(err: CatalogueRepositoryError) -> Self {
        match err {
            CatalogueRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
            }
            CatalogueRepositoryError::Query { message } => {
                Error::internal(format!("catalogue repository error: {message}"))
            }
            CatalogueRepositoryError::DuplicateSlug { slug } => {
                Error::conflict(format!("slug {slug} is already in use")).with_details(
                    serde_json::json!({ "field": "slug", "code": "duplicate_slug" }),
                )
            }
            CatalogueRepositoryError::UnknownLabel { slug } => Error::invalid_field(
                "slug",
                "unknown_label",
                format!("no category or genre with slug {slug}"),
            ),
        }
    }
}
