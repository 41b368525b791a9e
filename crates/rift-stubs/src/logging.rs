//! Tracing subscriber setup for embedders and test harnesses.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. `RUST_LOG` overrides `config.filter`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), anyhow::Error> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, anyhow::Error> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", config.filter, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_from_config() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "warn,rift_stubs=debug".to_string(),
            json: false,
        };
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("rift_stubs=debug"));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "rift_stubs=notalevel".to_string(),
            json: false,
        };
        assert!(build_filter(&config).is_err());
    }
}
