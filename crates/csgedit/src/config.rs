//! Engine configuration.
//!
//! Read from a TOML file:
//!
//! ```toml
//! max_depth = 256
//! name_retry_budget = 100000
//!
//! [tolerance]
//! dist = 0.0005
//! perp = 1e-6
//! ```
//!
//! Every key is optional.

use std::path::Path;

use csgedit_math::Tolerance;
use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};

/// Knobs shared by push, xpush and pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditConfig {
    /// Deepest combination nesting a walk will follow before giving up.
    pub max_depth: usize,
    /// How many candidate names the allocator tries per duplicate.
    pub name_retry_budget: u32,
    /// Matrix and geometry comparison tolerance.
    pub tolerance: Tolerance,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            name_retry_budget: 100_000,
            tolerance: Tolerance::DEFAULT,
        }
    }
}

impl EditConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EditError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EditError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values the engines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(EditError::Config("max_depth must be at least 1".into()));
        }
        if self.name_retry_budget == 0 {
            return Err(EditError::Config(
                "name_retry_budget must be at least 1".into(),
            ));
        }
        let Tolerance { dist, perp } = self.tolerance;
        if !(dist > 0.0 && dist.is_finite()) || !(perp > 0.0 && perp.is_finite()) {
            return Err(EditError::Config(
                "tolerances must be positive and finite".into(),
            ));
        }
        Ok(())
    }
}
