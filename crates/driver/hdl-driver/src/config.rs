//! Driver options loaded from TOML

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options controlling tree dumps, checks and diagnostic handling
///
/// ```toml
/// dump_tree = 0
/// dump_dir = "obj_dir"
/// check_tree = true
/// fatal_diagnostics = true
///
/// [dump_tree_pass]
/// assertpre = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverOptions {
    /// Dump level applied to every pass without an override
    pub dump_tree: u32,
    /// Per-pass dump levels keyed by pass name
    pub dump_tree_pass: IndexMap<String, u32>,
    /// Directory receiving `<index>_<pass>.tree` files
    pub dump_dir: PathBuf,
    /// Run the tree consistency check after every pass
    pub check_tree: bool,
    /// Treat any reported diagnostic as a failed run
    pub fatal_diagnostics: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            dump_tree: 0,
            dump_tree_pass: IndexMap::new(),
            dump_dir: PathBuf::from("obj_dir"),
            check_tree: true,
            fatal_diagnostics: true,
        }
    }
}

impl DriverOptions {
    /// Dump level in effect for `pass`
    #[must_use]
    pub fn level_for(&self, pass: &str) -> u32 {
        self.dump_tree_pass
            .get(pass)
            .copied()
            .unwrap_or(self.dump_tree)
    }

    /// Parse options from TOML text
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read options from a TOML file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}
