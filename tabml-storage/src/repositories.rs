pub mod api;
pub mod model;
pub mod run;

pub use api::*;
pub use model::*;
pub use run::*;

use tabml_core::{CoreError, Result};

/// Decode the `document` column of a row.
fn document<T: serde::de::DeserializeOwned>(row: &sqlx::postgres::PgRow) -> Result<T> {
    use sqlx::Row;

    let value: serde_json::Value = row.try_get("document")?;
    serde_json::from_value(value).map_err(CoreError::from)
}

/// Map a unique-constraint violation to `AlreadyExists`.
fn unique_violation(err: sqlx::Error, what: &str) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            CoreError::AlreadyExists(what.to_string())
        }
        _ => CoreError::from(err),
    }
}
