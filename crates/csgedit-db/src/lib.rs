//! Object database for the csgedit ecosystem.
//!
//! Every object is a named directory entry holding either a primitive solid
//! or a combination. A combination is an ordered list of leaves, each naming
//! another object and optionally carrying a placement matrix. Because any
//! number of leaves may name the same object, the hierarchy is a DAG.
//!
//! [`Database`] is the in-memory [`ObjectStore`]; [`Document`] is its JSON
//! file format.

pub mod error;
pub mod store;
pub mod tree;

pub use csgedit_math::{Tolerance, Transform};
pub use csgedit_primitives::Primitive;
pub use error::{DbError, Result};
pub use store::{Database, ObjectStore};
pub use tree::{walk_leaves, Action};

use serde::{Deserialize, Serialize};

slotmap::new_key_type! {
    /// Handle for a directory entry, valid for the lifetime of the store.
    pub struct EntryId;
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Primitive solid.
    Solid,
    /// Combination; `region` marks it as a material region.
    Combination {
        /// Whether the combination is a region.
        region: bool,
    },
}

impl ObjectKind {
    /// `true` for solids.
    pub fn is_solid(&self) -> bool {
        matches!(self, ObjectKind::Solid)
    }

    /// `true` for combinations and regions.
    pub fn is_combination(&self) -> bool {
        matches!(self, ObjectKind::Combination { .. })
    }
}

/// The unique-name record identifying an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Unique object name.
    pub name: String,
    /// Solid or combination.
    pub kind: ObjectKind,
}

/// Boolean operator applied to a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolOp {
    /// Union.
    #[default]
    Union,
    /// Intersection.
    Intersect,
    /// Subtraction.
    Subtract,
}

impl BoolOp {
    /// Single-character operator symbol (`u`, `+`, `-`).
    pub fn symbol(&self) -> char {
        match self {
            BoolOp::Union => 'u',
            BoolOp::Intersect => '+',
            BoolOp::Subtract => '-',
        }
    }
}

/// One edge of the hierarchy: a reference to another object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Name of the referenced object.
    pub name: String,
    /// Boolean operator.
    #[serde(default)]
    pub op: BoolOp,
    /// Placement of the referenced object; `None` is the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Transform>,
}

impl Leaf {
    /// Union leaf with no matrix.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: BoolOp::Union,
            matrix: None,
        }
    }

    /// Builder: set the operator.
    pub fn with_op(mut self, op: BoolOp) -> Self {
        self.op = op;
        self
    }

    /// Builder: set the matrix.
    pub fn with_matrix(mut self, matrix: Transform) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// The leaf matrix, identity when absent.
    pub fn effective_matrix(&self) -> Transform {
        self.matrix.unwrap_or_default()
    }

    /// `true` when the leaf carries no placement (absent or identity).
    pub fn is_identity(&self, tol: &Tolerance) -> bool {
        self.matrix.as_ref().map_or(true, |m| tol.is_identity(m))
    }
}

/// A combination's body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Combination {
    /// Whether this combination is a region.
    #[serde(default)]
    pub region: bool,
    /// Members in stored order.
    pub leaves: Vec<Leaf>,
}

impl Combination {
    /// Non-region combination with the given leaves.
    pub fn new(leaves: Vec<Leaf>) -> Self {
        Self {
            region: false,
            leaves,
        }
    }

    /// Region with the given leaves.
    pub fn region(leaves: Vec<Leaf>) -> Self {
        Self {
            region: true,
            leaves,
        }
    }

    /// Entry kind matching this body.
    pub fn kind(&self) -> ObjectKind {
        ObjectKind::Combination {
            region: self.region,
        }
    }
}

/// The stored representation of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Internal {
    /// Primitive solid parameters.
    Solid(Primitive),
    /// Combination tree.
    Combination(Combination),
}

impl Internal {
    /// Entry kind matching this body.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Internal::Solid(_) => ObjectKind::Solid,
            Internal::Combination(comb) => comb.kind(),
        }
    }
}

/// One named object in a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Object name.
    pub name: String,
    /// Stored representation.
    pub body: Internal,
}

/// A csgedit database file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Format version string (e.g. "0.1").
    pub version: String,
    /// Maximum object name length, for legacy length-limited databases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_limit: Option<usize>,
    /// All objects, in name order.
    pub objects: Vec<Object>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            name_limit: None,
            objects: Vec::new(),
        }
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
