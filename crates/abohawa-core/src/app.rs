use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, ValidationResult};

/// Application state and lifecycle
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Load and validate configuration from the default location
    pub fn new() -> Result<Self> {
        let (config, validation) = Config::load_validated()?;
        Ok(Self {
            config: Arc::new(config),
            validation,
        })
    }

    /// Build from an already-loaded configuration, validating it.
    pub fn from_config(config: Config) -> Result<Self> {
        let validation = config.validate();
        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }
        Ok(Self {
            config: Arc::new(config),
            validation,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Warnings collected when the configuration was loaded.
    pub fn warnings(&self) -> &[crate::config::ConfigValidationError] {
        &self.validation.warnings
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_from_config_keeps_warnings() {
        let mut config = Config::default();
        config.weather.refresh_minutes = 0;
        let app = App::from_config(config).unwrap();
        assert_eq!(app.warnings().len(), 1);
        assert_eq!(app.config().weather.refresh_minutes, 0);
    }

    #[test]
    fn test_from_config_rejects_errors() {
        let mut config = Config::default();
        config.weather.timeout_secs = 0;
        assert!(App::from_config(config).is_err());
    }
}
