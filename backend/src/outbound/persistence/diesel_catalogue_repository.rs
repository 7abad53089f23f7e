//! PostgreSQL-backed catalogue adapter: categories, genres and titles.
//!
//! Title reads assemble each record from three narrow queries (titles, their
//! labels, a `COUNT`/`SUM` aggregate over reviews) so ratings are always
//! computed from current rows. Title writes resolve label slugs and replace
//! genre links in one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::{count_star, sum};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::catalogue::{
    CatalogueName, Label, LabelKind, Slug, TitleDraft, TitleFilter, TitleId, TitleRecord,
    TitleYear,
};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{CatalogueRepository, CatalogueRepositoryError};
use crate::domain::rating::ScoreTally;

use super::diesel_error_mapping::{
    DieselFailure, classify, contains_pattern, page_bounds, pool_message, row_count,
};
use super::models::{GenreTitleRow, LabelRow, TitleRow, TitleValues};
use super::pool::{DbPool, PoolError};
use super::schema::{categories, genre_titles, genres, reviews, titles};

/// Run `$body` with `$table` bound to the schema module for `$kind`.
macro_rules! with_label_table {
    ($kind:expr, $table:ident => $body:expr) => {
        match $kind {
            LabelKind::Category => {
                use super::schema::categories as $table;
                $body
            }
            LabelKind::Genre => {
                use super::schema::genres as $table;
                $body
            }
        }
    };
}

/// Diesel implementation of the catalogue port.
#[derive(Clone)]
pub struct DieselCatalogueRepository {
    pool: DbPool,
}

impl DieselCatalogueRepository {
    /// Create a repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CatalogueRepositoryError {
    CatalogueRepositoryError::connection(pool_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> CatalogueRepositoryError {
    match classify(error) {
        DieselFailure::Unique { constraint } => CatalogueRepositoryError::duplicate_slug(
            constraint.unwrap_or_else(|| "slug".to_owned()),
        ),
        DieselFailure::Connection { message } => CatalogueRepositoryError::connection(message),
        DieselFailure::ForeignKey { message } | DieselFailure::Query { message } => {
            CatalogueRepositoryError::query(message)
        }
    }
}

/// Lets `?` work inside transaction closures.
impl From<diesel::result::Error> for CatalogueRepositoryError {
    fn from(error: diesel::result::Error) -> Self {
        map_diesel_error(error)
    }
}

fn row_to_label(row: LabelRow) -> Result<Label, CatalogueRepositoryError> {
    let corrupt = |err: &dyn std::fmt::Display| {
        CatalogueRepositoryError::query(format!("invalid label row {}: {err}", row.id))
    };
    Ok(Label {
        name: CatalogueName::new(row.name.as_str()).map_err(|err| corrupt(&err))?,
        slug: Slug::new(row.slug.as_str()).map_err(|err| corrupt(&err))?,
    })
}

fn tally_of(count: i64, total: Option<i64>) -> ScoreTally {
    ScoreTally {
        count: u64::try_from(count).unwrap_or_default(),
        sum: total.and_then(|total| u64::try_from(total).ok()).unwrap_or_default(),
    }
}

fn filtered_titles(filter: &TitleFilter) -> titles::BoxedQuery<'static, Pg> {
    let mut query = titles::table.into_boxed();
    if let Some(name) = filter.name.as_deref().filter(|name| !name.is_empty()) {
        query = query.filter(titles::name.ilike(contains_pattern(name)));
    }
    if let Some(year) = filter.year {
        query = query.filter(titles::year.eq(year));
    }
    if let Some(category) = &filter.category {
        let ids = categories::table
            .filter(categories::slug.eq(category.as_str().to_owned()))
            .select(categories::id.nullable());
        query = query.filter(titles::category_id.eq_any(ids));
    }
    if let Some(genre) = &filter.genre {
        let ids = genre_titles::table
            .inner_join(genres::table)
            .filter(genres::slug.eq(genre.as_str().to_owned()))
            .select(genre_titles::title_id);
        query = query.filter(titles::id.eq_any(ids));
    }
    query
}

/// Resolve the draft's slugs to row ids, failing on the first unknown slug.
async fn resolve_labels(
    conn: &mut AsyncPgConnection,
    draft: &TitleDraft,
) -> Result<(Option<i64>, Vec<i64>), CatalogueRepositoryError> {
    let category_id = match &draft.category {
        None => None,
        Some(slug) => {
            let id: Option<i64> = categories::table
                .filter(categories::slug.eq(slug.as_str()))
                .select(categories::id)
                .first(conn)
                .await
                .optional()?;
            Some(id.ok_or_else(|| CatalogueRepositoryError::unknown_label(slug.as_str()))?)
        }
    };

    let slugs: Vec<&str> = draft.genres.iter().map(Slug::as_str).collect();
    let found: Vec<(i64, String)> = genres::table
        .filter(genres::slug.eq_any(slugs))
        .select((genres::id, genres::slug))
        .load(conn)
        .await?;
    let by_slug: HashMap<String, i64> = found.into_iter().map(|(id, slug)| (slug, id)).collect();
    let genre_ids = draft
        .genres
        .iter()
        .map(|slug| {
            by_slug
                .get(slug.as_str())
                .copied()
                .ok_or_else(|| CatalogueRepositoryError::unknown_label(slug.as_str()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((category_id, genre_ids))
}

async fn replace_genre_links(
    conn: &mut AsyncPgConnection,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), CatalogueRepositoryError> {
    diesel::delete(genre_titles::table.filter(genre_titles::title_id.eq(title_id)))
        .execute(conn)
        .await?;
    let links: Vec<GenreTitleRow> = genre_ids
        .iter()
        .map(|&genre_id| GenreTitleRow { title_id, genre_id })
        .collect();
    if !links.is_empty() {
        diesel::insert_into(genre_titles::table)
            .values(&links)
            .execute(conn)
            .await?;
    }
    Ok(())
}

/// Attach categories, genres and review tallies to a batch of title rows.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    rows: Vec<TitleRow>,
) -> Result<Vec<TitleRecord>, CatalogueRepositoryError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let category_ids: Vec<i64> = rows.iter().filter_map(|row| row.category_id).collect();

    let category_rows: Vec<LabelRow> = categories::table
        .filter(categories::id.eq_any(category_ids))
        .select((categories::id, categories::name, categories::slug))
        .load(conn)
        .await?;
    let mut categories_by_id = HashMap::new();
    for row in category_rows {
        categories_by_id.insert(row.id, row_to_label(row)?);
    }

    let genre_rows: Vec<(i64, LabelRow)> = genre_titles::table
        .inner_join(genres::table)
        .filter(genre_titles::title_id.eq_any(ids.clone()))
        .order_by((genre_titles::title_id, genres::name))
        .select((genre_titles::title_id, (genres::id, genres::name, genres::slug)))
        .load(conn)
        .await?;
    let mut genres_by_title: HashMap<i64, Vec<Label>> = HashMap::new();
    for (title_id, row) in genre_rows {
        genres_by_title
            .entry(title_id)
            .or_default()
            .push(row_to_label(row)?);
    }

    let tallies: Vec<(i64, i64, Option<i64>)> = reviews::table
        .filter(reviews::title_id.eq_any(ids))
        .group_by(reviews::title_id)
        .select((reviews::title_id, count_star(), sum(reviews::score)))
        .load(conn)
        .await?;
    let tallies_by_title: HashMap<i64, ScoreTally> = tallies
        .into_iter()
        .map(|(title_id, count, total)| (title_id, tally_of(count, total)))
        .collect();

    rows.into_iter()
        .map(|row| -> Result<TitleRecord, CatalogueRepositoryError> {
            Ok(TitleRecord {
                id: TitleId::new(row.id),
                name: CatalogueName::new(row.name.as_str()).map_err(|err| {
                    CatalogueRepositoryError::query(format!("invalid title row {}: {err}", row.id))
                })?,
                year: TitleYear::from_stored(row.year),
                description: row.description,
                category: row
                    .category_id
                    .and_then(|id| categories_by_id.get(&id).cloned()),
                genres: genres_by_title.remove(&row.id).unwrap_or_default(),
                tally: tallies_by_title.get(&row.id).copied().unwrap_or_default(),
            })
        })
        .collect()
}

#[async_trait]
impl CatalogueRepository for DieselCatalogueRepository {
    async fn list_labels(
        &self,
        kind: LabelKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Label>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let pattern = search
            .filter(|term| !term.is_empty())
            .map(|term| contains_pattern(&term));
        let (limit, offset) = page_bounds(page.limit(), page.offset());

        let (count, rows): (i64, Vec<LabelRow>) = with_label_table!(kind, table => {
            let filtered = || {
                let mut query: table::BoxedQuery<'_, Pg> = table::table.into_boxed();
                if let Some(pattern) = &pattern {
                    query = query.filter(table::name.ilike(pattern.clone()));
                }
                query
            };
            let count = filtered().count().get_result(&mut conn).await?;
            let rows = filtered()
                .select((table::id, table::name, table::slug))
                .order_by((table::name, table::slug))
                .limit(limit)
                .offset(offset)
                .load(&mut conn)
                .await?;
            (count, rows)
        });

        Ok(Page {
            count: row_count(count),
            results: rows
                .into_iter()
                .map(row_to_label)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn find_label(
        &self,
        kind: LabelKind,
        slug: &Slug,
    ) -> Result<Option<Label>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<LabelRow> = with_label_table!(kind, table => {
            table::table
                .filter(table::slug.eq(slug.as_str()))
                .select((table::id, table::name, table::slug))
                .first(&mut conn)
                .await
                .optional()?
        });
        row.map(row_to_label).transpose()
    }

    async fn insert_label(
        &self,
        kind: LabelKind,
        label: &Label,
    ) -> Result<(), CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let result = with_label_table!(kind, table => {
            diesel::insert_into(table::table)
                .values((
                    table::name.eq(label.name.as_str()),
                    table::slug.eq(label.slug.as_str()),
                ))
                .execute(&mut conn)
                .await
        });
        result.map(|_| ()).map_err(|error| match map_diesel_error(error) {
            CatalogueRepositoryError::DuplicateSlug { .. } => {
                CatalogueRepositoryError::duplicate_slug(label.slug.as_str())
            }
            other => other,
        })
    }

    async fn delete_label(
        &self,
        kind: LabelKind,
        slug: &Slug,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Foreign keys clear `titles.category_id` and drop `genre_titles` rows.
        let deleted = with_label_table!(kind, table => {
            diesel::delete(table::table.filter(table::slug.eq(slug.as_str())))
                .execute(&mut conn)
                .await?
        });
        Ok(deleted > 0)
    }

    async fn list_titles(
        &self,
        filter: TitleFilter,
        page: PageRequest,
    ) -> Result<Page<TitleRecord>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (limit, offset) = page_bounds(page.limit(), page.offset());
        let count: i64 = filtered_titles(&filter)
            .count()
            .get_result(&mut conn)
            .await?;
        let rows: Vec<TitleRow> = filtered_titles(&filter)
            .select(TitleRow::as_select())
            .order_by((titles::name, titles::id))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await?;
        Ok(Page {
            count: row_count(count),
            results: hydrate(&mut conn, rows).await?,
        })
    }

    async fn find_title(&self, id: TitleId) -> Result<Option<TitleRecord>, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TitleRow> = titles::table
            .find(id.get())
            .select(TitleRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(hydrate(&mut conn, vec![row]).await?.into_iter().next())
    }

    async fn insert_title(&self, draft: &TitleDraft) -> Result<TitleId, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let (category_id, genre_ids) = resolve_labels(conn, draft).await?;
                let id: i64 = diesel::insert_into(titles::table)
                    .values(&TitleValues {
                        name: draft.name.as_str(),
                        year: draft.year.get(),
                        description: draft.description.as_deref(),
                        category_id,
                    })
                    .returning(titles::id)
                    .get_result(conn)
                    .await?;
                replace_genre_links(conn, id, &genre_ids).await?;
                Ok(TitleId::new(id))
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_title(
        &self,
        id: TitleId,
        draft: &TitleDraft,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let (category_id, genre_ids) = resolve_labels(conn, draft).await?;
                let updated = diesel::update(titles::table.find(id.get()))
                    .set(&TitleValues {
                        name: draft.name.as_str(),
                        year: draft.year.get(),
                        description: draft.description.as_deref(),
                        category_id,
                    })
                    .execute(conn)
                    .await?;
                if updated == 0 {
                    return Ok(false);
                }
                replace_genre_links(conn, id.get(), &genre_ids).await?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_title(&self, id: TitleId) -> Result<bool, CatalogueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Reviews, their comments and genre links cascade.
        let deleted = diesel::delete(titles::table.find(id.get()))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}
