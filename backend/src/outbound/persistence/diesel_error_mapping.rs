//! Shared Diesel error classification for the repositories.
//!
//! Each repository turns a [`DieselFailure`] into its own port error, so the
//! constraint handling lives in one place and the port-specific wording lives
//! next to the port.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// What went wrong, stripped of driver detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// A unique constraint fired; carries the constraint name when known.
    Unique { constraint: Option<String> },
    /// A foreign key pointed at a missing row.
    ForeignKey { message: String },
    Connection { message: String },
    Query { message: String },
}

/// Extract a readable message from a pool error.
pub(crate) fn pool_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Classify a Diesel error and emit debug context.
pub(crate) fn classify(error: DieselError) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::Unique {
                constraint: info.constraint_name().map(str::to_owned),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            DieselFailure::ForeignKey {
                message: info.message().to_owned(),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DieselFailure::Connection {
                message: "database connection error".to_owned(),
            }
        }
        DieselError::NotFound => DieselFailure::Query {
            message: "record not found".to_owned(),
        },
        DieselError::QueryBuilderError(_) => DieselFailure::Query {
            message: "database query error".to_owned(),
        },
        _ => DieselFailure::Query {
            message: "database error".to_owned(),
        },
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Convert page bounds into the signed values Diesel's `LIMIT`/`OFFSET` take.
pub(crate) fn page_bounds(limit: u32, offset: u64) -> (i64, i64) {
    (i64::from(limit), i64::try_from(offset).unwrap_or(i64::MAX))
}

/// Convert a `COUNT(*)` result into the page total.
pub(crate) fn row_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn unique_violations_keep_the_constraint_slot() {
        let failure = classify(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        ));
        // String error info reports no constraint name.
        assert_eq!(failure, DieselFailure::Unique { constraint: None });
    }

    #[rstest]
    fn foreign_key_violations_carry_the_message() {
        let failure = classify(DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("violates foreign key constraint".to_owned()),
        ));
        assert_eq!(
            failure,
            DieselFailure::ForeignKey {
                message: "violates foreign key constraint".to_owned()
            }
        );
    }

    #[rstest]
    #[case(DieselError::NotFound, "record not found")]
    #[case(DieselError::RollbackTransaction, "database error")]
    fn other_errors_are_query_failures(#[case] error: DieselError, #[case] expected: &str) {
        assert_eq!(
            classify(error),
            DieselFailure::Query {
                message: expected.to_owned()
            }
        );
    }

    #[rstest]
    fn closed_connections_are_connection_failures() {
        let failure = classify(DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("closed".to_owned()),
        ));
        assert!(matches!(failure, DieselFailure::Connection { .. }));
    }

    #[rstest]
    #[case("drama", "%drama%")]
    #[case("100%", "%100\\%%")]
    #[case("a_b", "%a\\_b%")]
    fn search_terms_are_escaped(#[case] term: &str, #[case] expected: &str) {
        assert_eq!(contains_pattern(term), expected);
    }

    #[rstest]
    fn page_bounds_saturate() {
        assert_eq!(page_bounds(10, u64::MAX), (10, i64::MAX));
        assert_eq!(row_count(-1), 0);
    }
}
