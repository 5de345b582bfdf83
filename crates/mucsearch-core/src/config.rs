//! Query configuration
//!
//! All fields have defaults, so an empty JSON object is a valid config:
//!
//! ```json
//! { "match_mode": "prefix", "event_bus_capacity": 256, "source_display_name": "Chat rooms" }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default broadcast capacity for the query event bus
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Default display name of the chat room contact source
pub const DEFAULT_SOURCE_DISPLAY_NAME: &str = "Chat rooms";

/// How a query string is compared with room names and identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Literal, case-sensitive prefix (canonical rule)
    #[default]
    Prefix,
    /// Literal prefix after lowercasing both sides
    PrefixIgnoreCase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub match_mode: MatchMode,
    pub event_bus_capacity: usize,
    pub source_display_name: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
            source_display_name: DEFAULT_SOURCE_DISPLAY_NAME.to_string(),
        }
    }
}

impl QueryConfig {
    /// Parse a config from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse query config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query config: {:?}", path))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid query config: {:?}", path))
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    fn validate(&self) -> Result<()> {
        // tokio's broadcast channel panics on zero capacity
        if self.event_bus_capacity == 0 {
            anyhow::bail!("event_bus_capacity must be greater than zero");
        }
        Ok(())
    }
}
