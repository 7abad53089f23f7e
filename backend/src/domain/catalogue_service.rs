//! Catalogue use cases: categories, genres and titles.
//!
//! Reads are public. Writes need the admin tier. Title reads always carry a
//! rating derived from a fresh score tally.

use std::sync::Arc;

use chrono::Datelike;
use mockable::Clock;
use tracing::info;

use crate::domain::Error;
use crate::domain::access::{Operation, Requester, Resource, authorize};
use crate::domain::catalogue::{
    CatalogueName, Label, LabelKind, Slug, Title, TitleDraft, TitleFilter, TitleId, TitleYear,
};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::CatalogueRepository;

/// Submitted title fields before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleInput {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genres: Vec<String>,
}

/// Submitted title changes. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub genres: Option<Vec<String>>,
}

/// Catalogue use case.
pub struct CatalogueService<C: ?Sized> {
    repo: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<C: ?Sized> CatalogueService<C> {
    /// Create the service.
    pub fn new(repo: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<C> CatalogueService<C>
where
    C: CatalogueRepository + ?Sized,
{
    /// List categories or genres by name.
    pub async fn list_labels(
        &self,
        kind: LabelKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Label>, Error> {
        let search = search.filter(|term| !term.trim().is_empty());
        Ok(self.repo.list_labels(kind, search, page).await?)
    }

    /// Create a category or genre.
    pub async fn create_label(
        &self,
        requester: &Requester,
        kind: LabelKind,
        name: &str,
        slug: &str,
    ) -> Result<Label, Error> {
        authorize(requester, Operation::Create, Resource::Catalogue).into_result()?;
        let label = Label {
            name: CatalogueName::new(name)?,
            slug: Slug::new(slug)?,
        };
        self.repo.insert_label(kind, &label).await?;
        info!(kind = kind.noun(), slug = %label.slug, "label created");
        Ok(label)
    }

    /// Delete a category or genre by slug.
    pub async fn delete_label(
        &self,
        requester: &Requester,
        kind: LabelKind,
        slug: &str,
    ) -> Result<(), Error> {
        authorize(requester, Operation::Delete, Resource::Catalogue).into_result()?;
        let not_found = || Error::not_found(format!("{} {slug} not found", kind.noun()));
        let slug = Slug::new(slug).map_err(|_| not_found())?;
        if !self.repo.delete_label(kind, &slug).await? {
            return Err(not_found());
        }
        info!(kind = kind.noun(), %slug, "label deleted");
        Ok(())
    }

    /// List titles by name with optional filters.
    pub async fn list_titles(
        &self,
        filter: TitleFilter,
        page: PageRequest,
    ) -> Result<Page<Title>, Error> {
        let page = self.repo.list_titles(filter, page).await?;
        Ok(page.map(Title::from))
    }

    /// Fetch one title with its rating.
    pub async fn get_title(&self, id: TitleId) -> Result<Title, Error> {
        self.repo
            .find_title(id)
            .await?
            .map(Title::from)
            .ok_or_else(|| title_not_found(id))
    }

    /// Create a title.
    pub async fn create_title(
        &self,
        requester: &Requester,
        input: TitleInput,
    ) -> Result<Title, Error> {
        authorize(requester, Operation::Create, Resource::Catalogue).into_result()?;
        let draft = TitleDraft {
            name: CatalogueName::new(input.name)?,
            year: self.validate_year(input.year)?,
            description: input.description,
            category: self.resolve_category(input.category).await?,
            genres: self.resolve_genres(input.genres).await?,
        };
        let id = self.repo.insert_title(&draft).await?;
        info!(title_id = %id, "title created");
        self.get_title(id).await
    }

    /// Apply changes to a title.
    pub async fn update_title(
        &self,
        requester: &Requester,
        id: TitleId,
        changes: TitleChanges,
    ) -> Result<Title, Error> {
        authorize(requester, Operation::Update, Resource::Catalogue).into_result()?;
        let current = self
            .repo
            .find_title(id)
            .await?
            .ok_or_else(|| title_not_found(id))?;
        let mut draft = current.to_draft();
        if let Some(name) = changes.name {
            draft.name = CatalogueName::new(name)?;
        }
        if let Some(year) = changes.year {
            draft.year = self.validate_year(year)?;
        }
        if let Some(description) = changes.description {
            draft.description = description;
        }
        if let Some(category) = changes.category {
            draft.category = self.resolve_category(category).await?;
        }
        if let Some(genres) = changes.genres {
            draft.genres = self.resolve_genres(genres).await?;
        }
        if !self.repo.update_title(id, &draft).await? {
            return Err(title_not_found(id));
        }
        self.get_title(id).await
    }

    /// Delete a title with its reviews and comments.
    pub async fn delete_title(&self, requester: &Requester, id: TitleId) -> Result<(), Error> {
        authorize(requester, Operation::Delete, Resource::Catalogue).into_result()?;
        if !self.repo.delete_title(id).await? {
            return Err(title_not_found(id));
        }
        info!(title_id = %id, "title deleted");
        Ok(())
    }

    fn validate_year(&self, year: i32) -> Result<TitleYear, Error> {
        Ok(TitleYear::new(year, self.clock.utc().year())?)
    }

    async fn resolve_category(&self, slug: Option<String>) -> Result<Option<Slug>, Error> {
        match slug {
            None => Ok(None),
            Some(raw) => self.resolve(LabelKind::Category, raw).await.map(Some),
        }
    }

    async fn resolve_genres(&self, slugs: Vec<String>) -> Result<Vec<Slug>, Error> {
        let mut resolved: Vec<Slug> = Vec::with_capacity(slugs.len());
        for raw in slugs {
            let slug = self.resolve(LabelKind::Genre, raw).await?;
            if !resolved.contains(&slug) {
                resolved.push(slug);
            }
        }
        Ok(resolved)
    }

    async fn resolve(&self, kind: LabelKind, raw: String) -> Result<Slug, Error> {
        let field = kind.noun();
        let unknown = |raw: &str| {
            Error::invalid_field(
                field,
                "unknown_label",
                format!("{field} with slug {raw} does not exist"),
            )
        };
        let Ok(slug) = Slug::new(raw.clone()) else {
            return Err(unknown(&raw));
        };
        match self.repo.find_label(kind, &slug).await? {
            Some(_) => Ok(slug),
            None => Err(unknown(&raw)),
        }
    }
}

fn title_not_found(id: TitleId) -> Error {
    Error::not_found(format!("title {id} not found"))
}
