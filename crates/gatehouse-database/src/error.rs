//! Mapping of sqlx errors into [`AppError`].

use gatehouse_core::error::{AppError, ErrorKind};

/// Build a mapper that turns a sqlx error into a database error, or a
/// conflict when a unique constraint rejected the write.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |err| {
        let unique_violation = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique_violation {
            AppError::with_source(ErrorKind::Conflict, format!("{context}: already exists"), err)
        } else {
            AppError::with_source(ErrorKind::Database, context, err)
        }
    }
}
