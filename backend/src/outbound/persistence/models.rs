//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; repositories convert them
//! to domain records before returning.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{comments, genre_titles, reviews, titles, users};

/// Full account row, used for both reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub bio: String,
    pub first_name: String,
    pub last_name: String,
    pub confirmation_code: Option<String>,
    pub date_joined: DateTime<Utc>,
}

/// Mutable account columns. The username is never part of an update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserChangeset<'a> {
    pub email: &'a str,
    pub role: &'a str,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub bio: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub confirmation_code: Option<&'a str>,
}

/// Category or genre, selected with an explicit column tuple.
#[derive(Debug, Clone, Queryable)]
pub(crate) struct LabelRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = titles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = titles)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct TitleValues<'a> {
    pub name: &'a str,
    pub year: i32,
    pub description: Option<&'a str>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = genre_titles)]
pub(crate) struct GenreTitleRow {
    pub title_id: i64,
    pub genre_id: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReviewRow {
    pub id: i64,
    pub title_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reviews)]
pub(crate) struct NewReviewRow<'a> {
    pub title_id: i64,
    pub author_id: Uuid,
    pub text: &'a str,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommentRow {
    pub id: i64,
    pub review_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub(crate) struct NewCommentRow<'a> {
    pub review_id: i64,
    pub author_id: Uuid,
    pub text: &'a str,
    pub pub_date: DateTime<Utc>,
}
