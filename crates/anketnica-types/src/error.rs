//! Error types shared by every Anketnica crate.
//!
//! [`StoreError`] is what every engine's store trait returns, so engines
//! never see the persistence adapter's own error type. [`ParseLabelError`]
//! covers the game labels ranks and classes are stored under.

/// Errors reported by a persistence adapter to the engines.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or the operation failed in it.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Description of the underlying failure.
        reason: String,
    },

    /// A requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A stored record could not be decoded into its typed form.
    #[error("malformed {entity} record: {reason}")]
    Malformed {
        /// Kind of record that failed to decode.
        entity: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A write conflicted with the current stored state.
    #[error("conflicting write: {reason}")]
    Conflict {
        /// Description of the conflict.
        reason: String,
    },
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`StoreError::Malformed`].
    pub fn malformed(entity: &'static str, reason: impl ToString) -> Self {
        Self::Malformed {
            entity,
            reason: reason.to_string(),
        }
    }
}

/// A stored label did not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} label: {label:?}")]
pub struct ParseLabelError {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub label: String,
}

impl ParseLabelError {
    /// Create a parse error for the given enumeration and input.
    pub fn new(kind: &'static str, label: &str) -> Self {
        Self {
            kind,
            label: label.to_owned(),
        }
    }
}
