//! Error types for the persistence adapter.
//!
//! Store operations fail with [`DbError`], which converts into the
//! [`StoreError`] every engine's store trait returns.

use anketnica_types::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A `SQLite` migration failed.
    #[error("SQLite migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A column held a value its typed form cannot represent.
    #[error("Malformed {entity}: {reason}")]
    Decode {
        /// Table or record kind.
        entity: &'static str,
        /// What was wrong with the value.
        reason: String,
    },

    /// A row that must exist was missing.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table or record kind.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A write no longer matches the stored state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Shorthand for [`DbError::Decode`].
    pub fn decode(entity: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            entity,
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`DbError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => Self::NotFound { entity, id },
            DbError::Decode { entity, reason } => Self::Malformed { entity, reason },
            DbError::Serialization(e) => Self::Malformed {
                entity: "json column",
                reason: e.to_string(),
            },
            DbError::Sqlite(sqlx::Error::RowNotFound) => Self::NotFound {
                entity: "row",
                id: String::from("?"),
            },
            DbError::Sqlite(sqlx::Error::Database(e))
                if e.is_unique_violation()
                    || e.is_check_violation()
                    || e.is_foreign_key_violation() =>
            {
                Self::Conflict {
                    reason: e.to_string(),
                }
            }
            DbError::Sqlite(e) => Self::Unavailable {
                reason: e.to_string(),
            },
            DbError::Migration(e) => Self::Unavailable {
                reason: e.to_string(),
            },
            DbError::Conflict(reason) => Self::Conflict { reason },
            DbError::Config(reason) => Self::Unavailable { reason },
        }
    }
}
