//! Configuration for a virtual file family

use crate::security::{MAX_ENTRY_SIZE, MAX_NESTING_DEPTH};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration shared by every [`VirtualFile`](crate::VirtualFile) resolved
/// through one [`Vfs`](crate::Vfs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Separator used to split input segments and to build path strings
    pub separator: char,

    /// Maximum number of container ancestors
    pub max_depth: usize,

    /// Establish existence, kind and head bytes of nested candidates through
    /// their container chain. When off, candidates inside containers are
    /// judged by name alone.
    pub probe_nested_content: bool,

    /// Memory-map archives opened in direct mode
    pub use_mmap: bool,

    /// Upper bound on bytes materialized for a single entry
    pub max_entry_size: u64,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            separator: std::path::MAIN_SEPARATOR,
            max_depth: MAX_NESTING_DEPTH,
            probe_nested_content: true,
            use_mmap: false,
            max_entry_size: MAX_ENTRY_SIZE,
        }
    }
}

impl VfsConfig {
    /// Parse a configuration from JSON text
    ///
    /// Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Set the separator
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable content probing inside containers
    pub fn with_probe_nested_content(mut self, probe: bool) -> Self {
        self.probe_nested_content = probe;
        self
    }

    /// Enable or disable memory mapping in direct mode
    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Set the materialization limit
    pub fn with_max_entry_size(mut self, max_entry_size: u64) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.separator.is_control() || self.separator == '\0' {
            return Err(Error::invalid_config(format!(
                "Separator {:?} is not usable",
                self.separator
            )));
        }
        Ok(())
    }
}
