//! In-memory adapters for unit and integration tests.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature so the
//! integration suites under `tests/` can drive the real HTTP app without a
//! database. [`InMemoryStore`] enforces the same uniqueness rules and cascades
//! as the PostgreSQL schema, under one mutex.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::{Clock, DefaultClock};
use zeroize::Zeroizing;

use crate::domain::catalogue::{
    CatalogueName, Label, LabelKind, Slug, TitleDraft, TitleFilter, TitleId, TitleRecord, TitleYear,
};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{
    CONFIRMATION_CODE_LENGTH, CatalogueRepository, CatalogueRepositoryError,
    ConfirmationCodeGenerator, IdentityStore, IdentityStoreError, Notification, NotificationError,
    NotificationSink, ReviewRepository, ReviewRepositoryError, TokenIssuer,
};
use crate::domain::rating::ScoreTally;
use crate::domain::reviews::{
    Body, Comment, CommentId, NewComment, NewReview, Review, ReviewId, Score,
};
use crate::domain::{ConfirmationCode, EmailAddress, Role, User, UserId, Username};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::token::{DEFAULT_TOKEN_TTL_SECS, JwtTokenService};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock pinned to an instant, optionally advancing by `step` per reading.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl FixedClock {
    /// 2024-06-01T12:00:00Z.
    pub fn default_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Clock that always reads `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            step: Duration::zero(),
        }
    }

    /// Clock that advances by one second on every reading, so records created
    /// in sequence get distinct timestamps.
    pub fn ticking() -> Self {
        Self {
            now: Mutex::new(Self::default_instant()),
            step: Duration::seconds(1),
        }
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Self::default_instant())
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut now = lock(&self.now);
        let reading = *now;
        *now = reading + self.step;
        reading
    }
}

/// Deterministic confirmation codes: `CODE00000001`, `CODE00000002`, ...
#[derive(Debug, Default)]
pub struct SequenceCodeGenerator {
    next: AtomicU64,
}

impl ConfirmationCodeGenerator for SequenceCodeGenerator {
    fn generate(&self) -> ConfirmationCode {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        let raw = format!("CODE{n:0width$}", width = CONFIRMATION_CODE_LENGTH - 4);
        ConfirmationCode::from_generated(raw)
    }
}

/// Notification sink that records every message.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotificationSink {
    /// Make subsequent sends fail (they are still recorded).
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Every notification sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }

    /// Code from the most recent confirmation email to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        lock(&self.sent)
            .iter()
            .rev()
            .find(|notification| notification.recipient.as_str() == email)
            .and_then(|notification| {
                notification
                    .body
                    .rsplit_once(": ")
                    .map(|(_, code)| code.to_owned())
            })
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        lock(&self.sent).push(notification.clone());
        if self.failing.load(Ordering::Relaxed) {
            return Err(NotificationError::delivery("recording sink set to fail"));
        }
        Ok(())
    }
}

/// Failure injected into every [`InMemoryStore`] call until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Connection,
    Query,
}

#[derive(Debug, Clone)]
struct StoredTitle {
    id: TitleId,
    name: CatalogueName,
    year: TitleYear,
    description: Option<String>,
    category: Option<Slug>,
    genres: Vec<Slug>,
}

#[derive(Debug, Clone)]
struct StoredReview {
    id: ReviewId,
    title_id: TitleId,
    author: UserId,
    text: Body,
    score: Score,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: CommentId,
    review_id: ReviewId,
    author: UserId,
    text: Body,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    categories: Vec<Label>,
    genres: Vec<Label>,
    titles: Vec<StoredTitle>,
    reviews: Vec<StoredReview>,
    comments: Vec<StoredComment>,
    next_id: i64,
    failure: Option<StoreFailure>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn labels(&self, kind: LabelKind) -> &Vec<Label> {
        match kind {
            LabelKind::Category => &self.categories,
            LabelKind::Genre => &self.genres,
        }
    }

    fn labels_mut(&mut self, kind: LabelKind) -> &mut Vec<Label> {
        match kind {
            LabelKind::Category => &mut self.categories,
            LabelKind::Genre => &mut self.genres,
        }
    }

    fn label(&self, kind: LabelKind, slug: &Slug) -> Option<Label> {
        self.labels(kind)
            .iter()
            .find(|label| &label.slug == slug)
            .cloned()
    }

    fn username_of(&self, id: UserId) -> Option<Username> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
    }

    fn title_record(&self, title: &StoredTitle) -> TitleRecord {
        let tally = ScoreTally::of(
            self.reviews
                .iter()
                .filter(|review| review.title_id == title.id)
                .map(|review| review.score.get()),
        );
        TitleRecord {
            id: title.id,
            name: title.name.clone(),
            year: title.year,
            description: title.description.clone(),
            category: title
                .category
                .as_ref()
                .and_then(|slug| self.label(LabelKind::Category, slug)),
            genres: title
                .genres
                .iter()
                .filter_map(|slug| self.label(LabelKind::Genre, slug))
                .collect(),
            tally,
        }
    }

    fn review(&self, stored: &StoredReview) -> Option<Review> {
        Some(Review {
            id: stored.id,
            title_id: stored.title_id,
            author: stored.author,
            author_username: self.username_of(stored.author)?,
            text: stored.text.clone(),
            score: stored.score,
            pub_date: stored.pub_date,
        })
    }

    fn comment(&self, stored: &StoredComment) -> Option<Comment> {
        Some(Comment {
            id: stored.id,
            review_id: stored.review_id,
            author: stored.author,
            author_username: self.username_of(stored.author)?,
            text: stored.text.clone(),
            pub_date: stored.pub_date,
        })
    }

    fn validate_labels(&self, draft: &TitleDraft) -> Result<(), CatalogueRepositoryError> {
        if let Some(slug) = &draft.category {
            if self.label(LabelKind::Category, slug).is_none() {
                return Err(CatalogueRepositoryError::unknown_label(slug.as_str()));
            }
        }
        for slug in &draft.genres {
            if self.label(LabelKind::Genre, slug).is_none() {
                return Err(CatalogueRepositoryError::unknown_label(slug.as_str()));
            }
        }
        Ok(())
    }

    fn drop_review_cascade(&mut self, review_id: ReviewId) {
        self.reviews.retain(|review| review.id != review_id);
        self.comments.retain(|comment| comment.review_id != review_id);
    }
}

fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    Page {
        count: items.len() as u64,
        results: page.slice(items),
    }
}

/// Shared in-memory implementation of every persistence port.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `failure` until [`InMemoryStore::clear_failure`].
    pub fn fail_with(&self, failure: StoreFailure) {
        lock(&self.state).failure = Some(failure);
    }

    /// Stop injecting failures.
    pub fn clear_failure(&self) {
        lock(&self.state).failure = None;
    }

    /// Insert an account directly, bypassing sign-up.
    pub fn seed_user(&self, user: User) {
        lock(&self.state).users.push(user);
    }

    /// Number of stored accounts.
    pub fn user_count(&self) -> usize {
        lock(&self.state).users.len()
    }

    /// Number of stored comments across all reviews.
    pub fn comment_count(&self) -> usize {
        lock(&self.state).comments.len()
    }

    fn guard<E>(&self, to_error: impl Fn(StoreFailure) -> E) -> Result<MutexGuard<'_, State>, E> {
        let state = lock(&self.state);
        match state.failure {
            Some(failure) => Err(to_error(failure)),
            None => Ok(state),
        }
    }

    fn identity(&self) -> Result<MutexGuard<'_, State>, IdentityStoreError> {
        self.guard(|failure| match failure {
            StoreFailure::Connection => IdentityStoreError::connection("in-memory store offline"),
            StoreFailure::Query => IdentityStoreError::query("in-memory store query failed"),
        })
    }

    fn catalogue(&self) -> Result<MutexGuard<'_, State>, CatalogueRepositoryError> {
        self.guard(|failure| match failure {
            StoreFailure::Connection => {
                CatalogueRepositoryError::connection("in-memory store offline")
            }
            StoreFailure::Query => CatalogueRepositoryError::query("in-memory store query failed"),
        })
    }

    fn ledger(&self) -> Result<MutexGuard<'_, State>, ReviewRepositoryError> {
        self.guard(|failure| match failure {
            StoreFailure::Connection => ReviewRepositoryError::connection("in-memory store offline"),
            StoreFailure::Query => ReviewRepositoryError::query("in-memory store query failed"),
        })
    }
}

fn check_unique(
    users: &[User],
    candidate: &User,
    skip: Option<UserId>,
) -> Result<(), IdentityStoreError> {
    let others = users.iter().filter(|user| Some(user.id) != skip);
    for user in others {
        if user.username == candidate.username {
            return Err(IdentityStoreError::duplicate("username"));
        }
        if user.email == candidate.email {
            return Err(IdentityStoreError::duplicate("email"));
        }
    }
    Ok(())
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, IdentityStoreError> {
        let state = self.identity()?;
        Ok(state.users.iter().find(|user| &user.id == id).cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, IdentityStoreError> {
        let state = self.identity()?;
        Ok(state
            .users
            .iter()
            .find(|user| &user.username == username)
            .cloned())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, IdentityStoreError> {
        let state = self.identity()?;
        Ok(state.users.iter().find(|user| &user.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), IdentityStoreError> {
        let mut state = self.identity()?;
        check_unique(&state.users, user, None)?;
        state.users.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<bool, IdentityStoreError> {
        let mut state = self.identity()?;
        check_unique(&state.users, user, Some(user.id))?;
        let Some(stored) = state.users.iter_mut().find(|stored| stored.id == user.id) else {
            return Ok(false);
        };
        // Usernames are immutable; keep the stored one.
        let username = stored.username.clone();
        *stored = User {
            username,
            ..user.clone()
        };
        Ok(true)
    }

    async fn set_confirmation_code(
        &self,
        id: &UserId,
        code: &ConfirmationCode,
    ) -> Result<(), IdentityStoreError> {
        let mut state = self.identity()?;
        if let Some(user) = state.users.iter_mut().find(|user| &user.id == id) {
            user.confirmation_code = Some(code.clone());
        }
        Ok(())
    }

    async fn delete(&self, username: &Username) -> Result<bool, IdentityStoreError> {
        let mut state = self.identity()?;
        let Some(id) = state
            .users
            .iter()
            .find(|user| &user.username == username)
            .map(|user| user.id)
        else {
            return Ok(false);
        };
        state.users.retain(|user| user.id != id);
        let authored: Vec<ReviewId> = state
            .reviews
            .iter()
            .filter(|review| review.author == id)
            .map(|review| review.id)
            .collect();
        for review_id in authored {
            state.drop_review_cascade(review_id);
        }
        state.comments.retain(|comment| comment.author != id);
        Ok(true)
    }

    async fn list(
        &self,
        username: Option<Username>,
        page: PageRequest,
    ) -> Result<Page<User>, IdentityStoreError> {
        let state = self.identity()?;
        let mut users: Vec<User> = state
            .users
            .iter()
            .rev()
            .filter(|user| username.as_ref().is_none_or(|wanted| &user.username == wanted))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.date_joined.cmp(&a.date_joined));
        Ok(page_of(&users, page))
    }
}

#[async_trait]
impl CatalogueRepository for InMemoryStore {
    async fn list_labels(
        &self,
        kind: LabelKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Label>, CatalogueRepositoryError> {
        let state = self.catalogue()?;
        let needle = search.map(|term| term.to_lowercase());
        let mut labels: Vec<Label> = state
            .labels(kind)
            .iter()
            .filter(|label| {
                needle
                    .as_ref()
                    .is_none_or(|needle| label.name.as_str().to_lowercase().contains(needle))
            })
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(page_of(&labels, page))
    }

    async fn find_label(
        &self,
        kind: LabelKind,
        slug: &Slug,
    ) -> Result<Option<Label>, CatalogueRepositoryError> {
        let state = self.catalogue()?;
        Ok(state.label(kind, slug))
    }

    async fn insert_label(
        &self,
        kind: LabelKind,
        label: &Label,
    ) -> Result<(), CatalogueRepositoryError> {
        let mut state = self.catalogue()?;
        if state.label(kind, &label.slug).is_some() {
            return Err(CatalogueRepositoryError::duplicate_slug(label.slug.as_str()));
        }
        state.labels_mut(kind).push(label.clone());
        Ok(())
    }

    async fn delete_label(
        &self,
        kind: LabelKind,
        slug: &Slug,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut state = self.catalogue()?;
        let labels = state.labels_mut(kind);
        let before = labels.len();
        labels.retain(|label| &label.slug != slug);
        if labels.len() == before {
            return Ok(false);
        }
        for title in &mut state.titles {
            match kind {
                LabelKind::Category => {
                    if title.category.as_ref() == Some(slug) {
                        title.category = None;
                    }
                }
                LabelKind::Genre => title.genres.retain(|genre| genre != slug),
            }
        }
        Ok(true)
    }

    async fn list_titles(
        &self,
        filter: TitleFilter,
        page: PageRequest,
    ) -> Result<Page<TitleRecord>, CatalogueRepositoryError> {
        let state = self.catalogue()?;
        let needle = filter.name.as_ref().map(|name| name.to_lowercase());
        let mut titles: Vec<&StoredTitle> = state
            .titles
            .iter()
            .filter(|title| {
                needle
                    .as_ref()
                    .is_none_or(|needle| title.name.as_str().to_lowercase().contains(needle))
            })
            .filter(|title| filter.year.is_none_or(|year| title.year.get() == year))
            .filter(|title| {
                filter
                    .category
                    .as_ref()
                    .is_none_or(|slug| title.category.as_ref() == Some(slug))
            })
            .filter(|title| {
                filter
                    .genre
                    .as_ref()
                    .is_none_or(|slug| title.genres.contains(slug))
            })
            .collect();
        titles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let records: Vec<TitleRecord> = titles
            .into_iter()
            .map(|title| state.title_record(title))
            .collect();
        Ok(page_of(&records, page))
    }

    async fn find_title(&self, id: TitleId) -> Result<Option<TitleRecord>, CatalogueRepositoryError> {
        let state = self.catalogue()?;
        Ok(state
            .titles
            .iter()
            .find(|title| title.id == id)
            .map(|title| state.title_record(title)))
    }

    async fn insert_title(&self, draft: &TitleDraft) -> Result<TitleId, CatalogueRepositoryError> {
        let mut state = self.catalogue()?;
        state.validate_labels(draft)?;
        let id = TitleId::new(state.next_id());
        state.titles.push(StoredTitle {
            id,
            name: draft.name.clone(),
            year: draft.year,
            description: draft.description.clone(),
            category: draft.category.clone(),
            genres: draft.genres.clone(),
        });
        Ok(id)
    }

    async fn update_title(
        &self,
        id: TitleId,
        draft: &TitleDraft,
    ) -> Result<bool, CatalogueRepositoryError> {
        let mut state = self.catalogue()?;
        state.validate_labels(draft)?;
        let Some(title) = state.titles.iter_mut().find(|title| title.id == id) else {
            return Ok(false);
        };
        title.name = draft.name.clone();
        title.year = draft.year;
        title.description = draft.description.clone();
        title.category = draft.category.clone();
        title.genres = draft.genres.clone();
        Ok(true)
    }

    async fn delete_title(&self, id: TitleId) -> Result<bool, CatalogueRepositoryError> {
        let mut state = self.catalogue()?;
        let before = state.titles.len();
        state.titles.retain(|title| title.id != id);
        if state.titles.len() == before {
            return Ok(false);
        }
        let reviews: Vec<ReviewId> = state
            .reviews
            .iter()
            .filter(|review| review.title_id == id)
            .map(|review| review.id)
            .collect();
        for review_id in reviews {
            state.drop_review_cascade(review_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn find_review(
        &self,
        title_id: TitleId,
        review_id: ReviewId,
    ) -> Result<Option<Review>, ReviewRepositoryError> {
        let state = self.ledger()?;
        Ok(state
            .reviews
            .iter()
            .find(|review| review.id == review_id && review.title_id == title_id)
            .and_then(|review| state.review(review)))
    }

    async fn has_review_by(
        &self,
        title_id: TitleId,
        author: UserId,
    ) -> Result<bool, ReviewRepositoryError> {
        let state = self.ledger()?;
        Ok(state
            .reviews
            .iter()
            .any(|review| review.title_id == title_id && review.author == author))
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Review, ReviewRepositoryError> {
        let mut state = self.ledger()?;
        if state
            .reviews
            .iter()
            .any(|stored| stored.title_id == review.title_id && stored.author == review.author)
        {
            return Err(ReviewRepositoryError::duplicate_review());
        }
        if !state.titles.iter().any(|title| title.id == review.title_id) {
            return Err(ReviewRepositoryError::missing_parent(format!(
                "title {} not found",
                review.title_id
            )));
        }
        let stored = StoredReview {
            id: ReviewId::new(state.next_id()),
            title_id: review.title_id,
            author: review.author,
            text: review.text.clone(),
            score: review.score,
            pub_date: review.pub_date,
        };
        let view = state
            .review(&stored)
            .ok_or_else(|| ReviewRepositoryError::missing_parent("author not found"))?;
        state.reviews.push(stored);
        Ok(view)
    }

    async fn update_review(&self, review: &Review) -> Result<(), ReviewRepositoryError> {
        let mut state = self.ledger()?;
        if let Some(stored) = state.reviews.iter_mut().find(|stored| stored.id == review.id) {
            stored.text = review.text.clone();
            stored.score = review.score;
        }
        Ok(())
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<bool, ReviewRepositoryError> {
        let mut state = self.ledger()?;
        let existed = state.reviews.iter().any(|review| review.id == review_id);
        state.drop_review_cascade(review_id);
        Ok(existed)
    }

    async fn list_reviews(
        &self,
        title_id: TitleId,
        page: PageRequest,
    ) -> Result<Page<Review>, ReviewRepositoryError> {
        let state = self.ledger()?;
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|review| review.title_id == title_id)
            .filter_map(|review| state.review(review))
            .collect();
        reviews.sort_by(|a, b| a.pub_date.cmp(&b.pub_date).then_with(|| a.id.cmp(&b.id)));
        Ok(page_of(&reviews, page))
    }

    async fn find_comment(
        &self,
        review_id: ReviewId,
        comment_id: CommentId,
    ) -> Result<Option<Comment>, ReviewRepositoryError> {
        let state = self.ledger()?;
        Ok(state
            .comments
            .iter()
            .find(|comment| comment.id == comment_id && comment.review_id == review_id)
            .and_then(|comment| state.comment(comment)))
    }

    async fn insert_comment(
        &self,
        comment: &NewComment,
    ) -> Result<Comment, ReviewRepositoryError> {
        let mut state = self.ledger()?;
        if !state.reviews.iter().any(|review| review.id == comment.review_id) {
            return Err(ReviewRepositoryError::missing_parent(format!(
                "review {} not found",
                comment.review_id
            )));
        }
        let stored = StoredComment {
            id: CommentId::new(state.next_id()),
            review_id: comment.review_id,
            author: comment.author,
            text: comment.text.clone(),
            pub_date: comment.pub_date,
        };
        let view = state
            .comment(&stored)
            .ok_or_else(|| ReviewRepositoryError::missing_parent("author not found"))?;
        state.comments.push(stored);
        Ok(view)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), ReviewRepositoryError> {
        let mut state = self.ledger()?;
        if let Some(stored) = state
            .comments
            .iter_mut()
            .find(|stored| stored.id == comment.id)
        {
            stored.text = comment.text.clone();
        }
        Ok(())
    }

    async fn delete_comment(&self, comment_id: CommentId) -> Result<bool, ReviewRepositoryError> {
        let mut state = self.ledger()?;
        let before = state.comments.len();
        state.comments.retain(|comment| comment.id != comment_id);
        Ok(state.comments.len() != before)
    }

    async fn list_comments(
        &self,
        review_id: ReviewId,
        page: PageRequest,
    ) -> Result<Page<Comment>, ReviewRepositoryError> {
        let state = self.ledger()?;
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|comment| comment.review_id == review_id)
            .filter_map(|comment| state.comment(comment))
            .collect();
        comments.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then_with(|| b.id.cmp(&a.id)));
        Ok(page_of(&comments, page))
    }
}

/// Wires the in-memory adapters into an [`HttpState`] for HTTP tests.
///
/// Services read a ticking [`FixedClock`] so records get distinct
/// timestamps; tokens are minted against the wall clock because
/// `jsonwebtoken` validates expiry against it.
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub notifications: Arc<RecordingNotificationSink>,
    pub codes: Arc<SequenceCodeGenerator>,
    pub tokens: Arc<JwtTokenService>,
    pub clock: Arc<FixedClock>,
}

impl TestHarness {
    /// Fresh adapters with an empty store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            notifications: Arc::new(RecordingNotificationSink::default()),
            codes: Arc::new(SequenceCodeGenerator::default()),
            tokens: Arc::new(JwtTokenService::new(
                Zeroizing::new(b"integration-test-signing-key-0123456789".to_vec()),
                Arc::new(DefaultClock),
                Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            )),
            clock: Arc::new(FixedClock::ticking()),
        }
    }

    /// Port bundle over the shared adapters.
    pub fn ports(&self) -> HttpStatePorts {
        HttpStatePorts {
            identities: self.store.clone(),
            catalogue: self.store.clone(),
            reviews: self.store.clone(),
            notifications: self.notifications.clone(),
            codes: self.codes.clone(),
            token_issuer: self.tokens.clone(),
            token_verifier: self.tokens.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Handler state over the shared adapters.
    pub fn state(&self) -> HttpState {
        HttpState::new(self.ports())
    }

    /// Store an account with `role`, bypassing sign-up.
    pub fn seed_user(&self, username: &str, role: Role) -> User {
        let Ok(name) = Username::new(username) else {
            panic!("seeded username {username:?} is invalid");
        };
        let Ok(email) = EmailAddress::new(format!("{username}@example.com")) else {
            panic!("seeded email for {username:?} is invalid");
        };
        let mut user = User::register(name, email, self.codes.generate(), self.clock.utc());
        user.role = role;
        self.store.seed_user(user.clone());
        user
    }

    /// `Authorization` header value for `user`.
    pub fn bearer_for(&self, user: &User) -> String {
        match self.tokens.issue(&user.id, &user.username) {
            Ok(token) => format!("Bearer {}", token.expose()),
            Err(err) => panic!("test token could not be issued: {err}"),
        }
    }

    /// Remove an account and everything it authored.
    pub async fn delete_user(&self, username: &str) {
        let Ok(name) = Username::new(username) else {
            panic!("username {username:?} is invalid");
        };
        if !matches!(self.store.delete(&name).await, Ok(true)) {
            panic!("user {username:?} was not deleted");
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
