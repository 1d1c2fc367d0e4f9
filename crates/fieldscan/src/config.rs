// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Scanner configuration.
//!
//! Settings live under a `[fieldscan]` table so they can share a file with
//! the rest of a migration tool's configuration:
//!
//! ```toml
//! [fieldscan]
//! include_many_to_many = true
//! primary_key_name = "pk"
//! time_varying_defaults = ["myapp.clock.now"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Scanner settings
    #[serde(default)]
    pub fieldscan: ScanConfig,
}

/// Scanner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Resolve many-to-many descriptors as well as plain fields
    #[serde(default)]
    pub include_many_to_many: bool,

    /// Name of the implicit primary key field
    #[serde(default = "default_primary_key_name")]
    pub primary_key_name: String,

    /// Deepest base-class chain followed before giving up
    #[serde(default = "default_max_inheritance_depth")]
    pub max_inheritance_depth: usize,

    /// Extra dotted paths of callables whose result depends on when they run
    #[serde(default)]
    pub time_varying_defaults: Vec<String>,

    /// Rewrite keyword argument values that name an aliased model
    #[serde(default = "default_rewrite_keyword_aliases")]
    pub rewrite_keyword_aliases: bool,
}

fn default_primary_key_name() -> String {
    "id".to_string()
}

fn default_max_inheritance_depth() -> usize {
    32
}

fn default_rewrite_keyword_aliases() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_many_to_many: false,
            primary_key_name: default_primary_key_name(),
            max_inheritance_depth: default_max_inheritance_depth(),
            time_varying_defaults: Vec::new(),
            rewrite_keyword_aliases: default_rewrite_keyword_aliases(),
        }
    }
}

impl ScanConfig {
    /// Parse settings from TOML text containing a `[fieldscan]` table.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.fieldscan.validate()?;
        Ok(config.fieldscan)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_key_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "primary_key_name must not be empty".to_string(),
            ));
        }
        if let Some(path) = self
            .time_varying_defaults
            .iter()
            .find(|p| p.split('.').any(|segment| segment.is_empty()))
        {
            return Err(ConfigError::Invalid(format!(
                "time_varying_defaults entry '{path}' is not a dotted path"
            )));
        }
        Ok(())
    }
}
