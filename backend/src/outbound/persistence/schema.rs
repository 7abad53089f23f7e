//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Accounts. `username` and `email` carry unique constraints.
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        role -> Varchar,
        is_staff -> Bool,
        is_superuser -> Bool,
        bio -> Text,
        first_name -> Varchar,
        last_name -> Varchar,
        confirmation_code -> Nullable<Varchar>,
        date_joined -> Timestamptz,
    }
}

diesel::table! {
    categories (id) {
        id -> Int8,
        name -> Varchar,
        slug -> Varchar,
    }
}

diesel::table! {
    genres (id) {
        id -> Int8,
        name -> Varchar,
        slug -> Varchar,
    }
}

diesel::table! {
    /// Catalogue works. `category_id` is cleared when the category goes.
    titles (id) {
        id -> Int8,
        name -> Varchar,
        year -> Int4,
        description -> Nullable<Text>,
        category_id -> Nullable<Int8>,
    }
}

diesel::table! {
    genre_titles (title_id, genre_id) {
        title_id -> Int8,
        genre_id -> Int8,
    }
}

diesel::table! {
    /// One review per (title, author); `score` is checked to 1..=10.
    reviews (id) {
        id -> Int8,
        title_id -> Int8,
        author_id -> Uuid,
        text -> Text,
        score -> Int2,
        pub_date -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Int8,
        review_id -> Int8,
        author_id -> Uuid,
        text -> Text,
        pub_date -> Timestamptz,
    }
}

diesel::joinable!(titles -> categories (category_id));
diesel::joinable!(genre_titles -> titles (title_id));
diesel::joinable!(genre_titles -> genres (genre_id));
diesel::joinable!(reviews -> titles (title_id));
diesel::joinable!(reviews -> users (author_id));
diesel::joinable!(comments -> reviews (review_id));
diesel::joinable!(comments -> users (author_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    categories,
    genres,
    titles,
    genre_titles,
    reviews,
    comments,
);
