//! Error types for the object store.

use csgedit_primitives::PrimitiveError;
use thiserror::Error;

/// Errors returned by [`ObjectStore`](crate::ObjectStore) operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// No object with this name or id.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An object with this name already exists.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The name exceeds the store's length limit.
    #[error("name '{name}' exceeds the {limit}-character limit")]
    NameTooLong {
        /// Offending name.
        name: String,
        /// Store limit.
        limit: usize,
    },

    /// The entry exists but nothing has been written to it yet.
    #[error("object {0} has no stored representation")]
    NoData(String),

    /// A solid was written to a combination entry or vice versa.
    #[error("object {name} is not a {expected}")]
    WrongKind {
        /// Object name.
        name: String,
        /// Expected kind ("solid" or "combination").
        expected: &'static str,
    },

    /// Applying a matrix to a solid failed.
    #[error("cannot transform {name}: {source}")]
    Primitive {
        /// Object name.
        name: String,
        /// Underlying primitive error.
        #[source]
        source: PrimitiveError,
    },

    /// Reading or writing the database file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The database file is not valid JSON for this format.
    #[error("invalid database document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, DbError>;
