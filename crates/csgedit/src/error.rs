//! Error types for the editing engines.

use csgedit_db::DbError;
use csgedit_primitives::PrimitiveError;
use thiserror::Error;

/// Errors returned by push, xpush, pull and their helpers.
#[derive(Error, Debug)]
pub enum EditError {
    /// A named object does not exist.
    #[error("{0} does not exist")]
    NotFound(String),

    /// The operation needs a primitive solid.
    #[error("{0} is not a primitive")]
    NotAPrimitive(String),

    /// The operation needs a combination.
    #[error("{0} is not a combination")]
    NotACombination(String),

    /// The use registry handed out more copies than the counting passes
    /// accounted for.
    #[error("ran out of uses for {0}")]
    ExhaustedUses(String),

    /// The hierarchy contains itself (or is deeper than the configured bound).
    #[error("cyclic hierarchy at {0}")]
    CyclicHierarchy(String),

    /// No unique duplicate name could be produced.
    #[error("cannot allocate a unique name for {0}")]
    NameCollision(String),

    /// A store operation failed.
    #[error("{op} failed for {name}: {source}")]
    StoreIo {
        /// Store operation ("read", "write", "create", "delete").
        op: &'static str,
        /// Object the operation was applied to.
        name: String,
        /// Underlying store error.
        #[source]
        source: DbError,
    },

    /// A leaf matrix survived a pass that should have cleared it.
    #[error("leaf {leaf} of {comb} still carries a transform")]
    UnresolvedTransform {
        /// Combination holding the leaf.
        comb: String,
        /// Leaf target name.
        leaf: String,
    },

    /// Push reached the same solid under two different matrices.
    #[error("{solid} would move in two directions (second reference via {path})")]
    ConflictingTransforms {
        /// Solid name.
        solid: String,
        /// Path of the conflicting reference.
        path: String,
    },

    /// Pull was given a hierarchy in which an object is referenced twice.
    #[error("{0} is referenced more than once; pull needs a tree")]
    SharedObject(String),

    /// Moving a solid into or out of its natural frame failed.
    #[error("cannot transform {name}: {source}")]
    Transform {
        /// Solid name.
        name: String,
        /// Underlying primitive error.
        #[source]
        source: PrimitiveError,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for editing operations.
pub type Result<T> = std::result::Result<T, EditError>;

/// Adapter for `map_err` on store calls.
pub(crate) fn store_io(op: &'static str, name: &str) -> impl FnOnce(DbError) -> EditError {
    let name = name.to_string();
    move |source| EditError::StoreIo { op, name, source }
}
