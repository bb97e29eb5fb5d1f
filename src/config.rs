//! Extension options

use crate::error::Result;
use crate::storage::DEFAULT_CHILD_LIMIT;
use log::Level;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrailConfig {
    /// Child limit written into stores created for new windows
    pub default_child_limit: usize,
    pub log_level: String,
}

impl Default for TrailConfig {
    fn default() -> Self {
        TrailConfig {
            default_child_limit: DEFAULT_CHILD_LIMIT,
            log_level: "info".to_string(),
        }
    }
}

impl TrailConfig {
    /// Parse an options object; `null` means all defaults
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Configured log level, falling back to `Info` on unknown names
    pub fn level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::Info)
    }
}
