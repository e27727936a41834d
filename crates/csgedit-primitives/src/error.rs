//! Error types for primitive transforms.

use thiserror::Error;

/// Errors that can occur when transforming a primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrimitiveError {
    /// The matrix has no inverse, so the solid would collapse.
    #[error("singular transform")]
    Singular,

    /// The primitive can only represent uniformly scaled copies of itself.
    #[error("{kind} requires a uniform scale, got ({sx}, {sy}, {sz})")]
    NonUniformScale {
        /// Primitive kind name.
        kind: &'static str,
        /// Scale along X.
        sx: f64,
        /// Scale along Y.
        sy: f64,
        /// Scale along Z.
        sz: f64,
    },

    /// The primitive has a zero-length axis or coincident vertices.
    #[error("degenerate {0}")]
    Degenerate(&'static str),
}

/// Result type for primitive operations.
pub type Result<T> = std::result::Result<T, PrimitiveError>;
