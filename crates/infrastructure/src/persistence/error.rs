//! Mapping sqlx errors into application errors

use application::ApplicationError;

/// Fold a sqlx error into the application taxonomy.
///
/// Row-not-found keeps its identity; everything else is a database fault,
/// which classifies as retryable-transient.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::Database("Row not found".to_string())
        },
        other => ApplicationError::Database(other.to_string()),
    }
}
