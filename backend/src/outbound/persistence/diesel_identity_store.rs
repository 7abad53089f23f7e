//! PostgreSQL-backed `IdentityStore`.
//!
//! Unique violations on `users_username_key` / `users_email_key` surface as
//! [`IdentityStoreError::Duplicate`] naming the colliding field. Deleting an
//! account relies on `ON DELETE CASCADE` to remove its reviews and comments.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{IdentityStore, IdentityStoreError};
use crate::domain::{
    ConfirmationCode, EmailAddress, PersonName, Role, User, UserId, Username,
};

use super::diesel_error_mapping::{DieselFailure, classify, page_bounds, pool_message, row_count};
use super::models::{UserChangeset, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel implementation of the account store.
#[derive(Clone)]
pub struct DieselIdentityStore {
    pool: DbPool,
}

impl DieselIdentityStore {
    /// Create a store over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> IdentityStoreError {
    IdentityStoreError::connection(pool_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> IdentityStoreError {
    match classify(error) {
        DieselFailure::Unique { constraint } => {
            let field = match constraint.as_deref() {
                Some(name) if name.contains("email") => "email",
                _ => "username",
            };
            IdentityStoreError::duplicate(field)
        }
        DieselFailure::Connection { message } => IdentityStoreError::connection(message),
        DieselFailure::ForeignKey { message } | DieselFailure::Query { message } => {
            IdentityStoreError::query(message)
        }
    }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> IdentityStoreError {
    IdentityStoreError::query(format!("invalid {column} in users row: {err}"))
}

impl TryFrom<UserRow> for User {
    type Error = IdentityStoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from_uuid(row.id),
            username: Username::new(row.username).map_err(|err| corrupt("username", err))?,
            email: EmailAddress::new(row.email).map_err(|err| corrupt("email", err))?,
            role: Role::parse(&row.role).map_err(|err| corrupt("role", err))?,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            bio: row.bio,
            first_name: PersonName::new(row.first_name)
                .map_err(|err| corrupt("first_name", err))?,
            last_name: PersonName::new(row.last_name).map_err(|err| corrupt("last_name", err))?,
            confirmation_code: row
                .confirmation_code
                .map(ConfirmationCode::new)
                .transpose()
                .map_err(|err| corrupt("confirmation_code", err))?,
            date_joined: row.date_joined,
        })
    }
}

fn to_row(user: &User) -> UserRow {
    UserRow {
        id: *user.id.as_uuid(),
        username: user.username.as_str().to_owned(),
        email: user.email.as_str().to_owned(),
        role: user.role.as_str().to_owned(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        bio: user.bio.clone(),
        first_name: user.first_name.as_str().to_owned(),
        last_name: user.last_name.as_str().to_owned(),
        confirmation_code: user
            .confirmation_code
            .as_ref()
            .map(|code| code.expose().to_owned()),
        date_joined: user.date_joined,
    }
}

fn to_changeset(user: &User) -> UserChangeset<'_> {
    UserChangeset {
        email: user.email.as_str(),
        role: user.role.as_str(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        bio: user.bio.as_str(),
        first_name: user.first_name.as_str(),
        last_name: user.last_name.as_str(),
        confirmation_code: user.confirmation_code.as_ref().map(ConfirmationCode::expose),
    }
}

impl DieselIdentityStore {
    async fn find_one<F>(&self, filter: F) -> Result<Option<User>, IdentityStoreError>
    where
        F: FnOnce(users::BoxedQuery<'static, diesel::pg::Pg>) -> users::BoxedQuery<'static, diesel::pg::Pg>,
    {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = filter(users::table.into_boxed())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl IdentityStore for DieselIdentityStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, IdentityStoreError> {
        let id = *id.as_uuid();
        self.find_one(|query| query.filter(users::id.eq(id))).await
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, IdentityStoreError> {
        let username = username.as_str().to_owned();
        self.find_one(|query| query.filter(users::username.eq(username)))
            .await
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, IdentityStoreError> {
        let email = email.as_str().to_owned();
        self.find_one(|query| query.filter(users::email.eq(email))).await
    }

    async fn insert(&self, user: &User) -> Result<(), IdentityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(&to_row(user))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(&self, user: &User) -> Result<bool, IdentityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(*user.id.as_uuid()))
            .set(&to_changeset(user))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn set_confirmation_code(
        &self,
        id: &UserId,
        code: &ConfirmationCode,
    ) -> Result<(), IdentityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(users::table.find(*id.as_uuid()))
            .set(users::confirmation_code.eq(Some(code.expose())))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete(&self, username: &Username) -> Result<bool, IdentityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(users::table.filter(users::username.eq(username.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn list(
        &self,
        username: Option<Username>,
        page: PageRequest,
    ) -> Result<Page<User>, IdentityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let filtered = || {
            let mut query = users::table.into_boxed();
            if let Some(username) = &username {
                query = query.filter(users::username.eq(username.as_str().to_owned()));
            }
            query
        };

        let count: i64 = filtered()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let (limit, offset) = page_bounds(page.limit(), page.offset());
        let rows: Vec<UserRow> = filtered()
            .select(UserRow::as_select())
            .order_by((users::date_joined.desc(), users::id))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(Page {
            count: row_count(count),
            results: rows
                .into_iter()
                .map(User::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    #[rstest]
    fn unnamed_unique_violations_default_to_username() {
        let err = map_diesel_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        ));
        assert_eq!(err, IdentityStoreError::duplicate("username"));
    }

    #[rstest]
    fn pool_errors_are_connection_errors() {
        let err = map_pool_error(PoolError::checkout("timed out"));
        assert!(matches!(err, IdentityStoreError::Connection { .. }));
    }

    #[rstest]
    fn rows_with_unknown_roles_are_rejected() {
        let row = UserRow {
            id: uuid::Uuid::new_v4(),
            username: "ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role: "owner".to_owned(),
            is_staff: false,
            is_superuser: false,
            bio: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            confirmation_code: None,
            date_joined: chrono::Utc::now(),
        };
        let err = User::try_from(row).expect_err("role is invalid");
        assert!(err.to_string().contains("role"));
    }

    #[rstest]
    fn rows_round_trip_through_the_domain() {
        let user = User::register(
            Username::new("ada").expect("username"),
            EmailAddress::new("ada@example.com").expect("email"),
            ConfirmationCode::new("CODECODECODE").expect("code"),
            chrono::Utc::now(),
        );
        let back = User::try_from(to_row(&user)).expect("valid row");
        assert_eq!(back.username, user.username);
        assert_eq!(back.role, Role::User);
        assert!(
            back.confirmation_code
                .is_some_and(|code| code.matches("CODECODECODE"))
        );
    }
}
