#![warn(missing_docs)]

//! csgedit: transform normalization for CSG object databases
//!
//! Push, xpush and pull move placement matrices between the leaves of a
//! combination hierarchy and the geometry of its solids without changing
//! what the hierarchy looks like in world space.
//!
//! # Example
//!
//! ```rust,no_run
//! use csgedit::{xpush, EditConfig};
//! use csgedit_db::{Combination, Database, Leaf, ObjectStore, Transform};
//! use csgedit_primitives::make_sphere;
//! use csgedit_math::Point3;
//!
//! let mut db = Database::new();
//! db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
//! db.put_comb("a", Combination::new(vec![Leaf::new("s")])).unwrap();
//! db.put_comb(
//!     "b",
//!     Combination::new(vec![Leaf::new("s").with_matrix(Transform::translation(1.0, 0.0, 0.0))]),
//! )
//! .unwrap();
//! db.put_comb("wrapper", Combination::new(vec![Leaf::new("a"), Leaf::new("b")])).unwrap();
//!
//! let wrapper = db.lookup("wrapper").unwrap();
//! let report = xpush(&mut db, wrapper, &EditConfig::default()).unwrap();
//! assert_eq!(report.created, 1);
//! ```

pub mod config;
pub mod copy;
pub mod counter;
pub mod error;
pub mod flatten;
pub mod identitize;
pub mod names;
pub mod pull;
pub mod push;
pub mod registry;
pub mod walk;
pub mod xpush;

pub use config::EditConfig;
pub use counter::{Counters, RunCounters};
pub use error::{EditError, Result};
pub use flatten::world_solids;
pub use identitize::{identitize, verify_identity};
pub use names::NameAllocator;
pub use pull::{pull, PullReport};
pub use push::{push, push_all, PushOutcome, PushReport, PushSummary};
pub use registry::{ObjectUse, UseRegistry, UseTarget};
pub use walk::functree;
pub use xpush::{xpush, XPushReport};
