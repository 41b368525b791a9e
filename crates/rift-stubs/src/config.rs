//! Engine configuration.
//!
//! Loaded from YAML (JSON is accepted too, being a YAML subset):
//!
//! ```yaml
//! urlConflict: reject        # or firstWins
//! defaultTransient: true
//! logging:
//!   filter: "info,rift_stubs=debug"
//!   json: false
//! scenarios:
//!   initial:
//!     checkout: EMPTY_CART
//! ```

use crate::pattern::UrlConflictPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Handling of legacy patterns that set several URL criteria
    #[serde(default)]
    pub url_conflict: UrlConflictPolicy,
    /// Whether stubs registered from documents start out transient
    #[serde(default = "default_transient")]
    pub default_transient: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scenarios: ScenarioConfig,
}

fn default_transient() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url_conflict: UrlConflictPolicy::default(),
            default_transient: default_transient(),
            logging: LoggingConfig::default(),
            scenarios: ScenarioConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` env-filter directive. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    /// Starting state per scenario name; unlisted scenarios start at `Started`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub initial: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.logging.filter.trim().is_empty() {
            anyhow::bail!("logging.filter must not be empty");
        }

        for (name, state) in &self.scenarios.initial {
            if name.trim().is_empty() {
                anyhow::bail!("scenarios.initial contains a blank scenario name");
            }
            if state.trim().is_empty() {
                anyhow::bail!("Initial state for scenario '{}' must not be blank", name);
            }
        }

        Ok(())
    }
}
