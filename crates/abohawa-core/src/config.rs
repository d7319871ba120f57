use std::path::{Path, PathBuf};
use std::time::Duration;

use abohawa_weather::{client, validate_coordinates, Coordinates, TemperatureUnit, WeatherClientConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const API_KEY_ENV: &str = "ABOHAWA_API_KEY";
const CONFIG_FILE: &str = "config.toml";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location and unit used before any preference is stored
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub forecast_url: String,
    pub geocoding_url: String,
    pub reverse_geocoding_url: String,

    /// Sent as the `apikey` query parameter when set. `ABOHAWA_API_KEY` overrides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub reverse_geocode_ttl_secs: u64,

    /// Auto refresh interval in minutes; 0 disables it
    pub refresh_minutes: u32,

    pub forecast_days: u8,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: client::FORECAST_URL.to_string(),
            geocoding_url: client::GEOCODING_URL.to_string(),
            reverse_geocoding_url: client::REVERSE_GEOCODING_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
            cache_ttl_secs: 300,
            reverse_geocode_ttl_secs: 1800,
            refresh_minutes: 5,
            forecast_days: 7,
        }
    }
}

impl WeatherConfig {
    pub fn client_config(&self) -> WeatherClientConfig {
        WeatherClientConfig {
            forecast_url: self.forecast_url.clone(),
            geocoding_url: self.geocoding_url.clone(),
            reverse_geocoding_url: self.reverse_geocoding_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            forecast_days: self.forecast_days,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn reverse_geocode_ttl(&self) -> Duration {
        Duration::from_secs(self.reverse_geocode_ttl_secs)
    }

    /// `None` when auto refresh is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_minutes {
            0 => None,
            m => Some(Duration::from_secs(u64::from(m) * 60)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature_unit: TemperatureUnit,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location_name: "Dhaka".to_string(),
            latitude: 23.8103,
            longitude: 90.4125,
            temperature_unit: TemperatureUnit::Celsius,
        }
    }
}

impl DefaultsConfig {
    pub fn coordinates(&self) -> Result<Coordinates, ConfigError> {
        Coordinates::new(self.latitude, self.longitude)
            .map_err(|e| ConfigError::Invalid(format!("defaults: {}", e)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the preference file; the config directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefs_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("abohawa");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            defaults: DefaultsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            let mut config = Self::default();
            if let Some(dir) = config_path.parent() {
                config.config_dir = dir.to_path_buf();
            }
            config.save_to(config_path)?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.weather.api_key = Some(key.trim().to_string());
            }
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);
        validate_url(&self.weather.geocoding_url, "weather.geocoding_url", &mut result);
        validate_url(
            &self.weather.reverse_geocoding_url,
            "weather.reverse_geocoding_url",
            &mut result,
        );

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Request timeout must be greater than 0");
        }
        if self.weather.cache_ttl_secs == 0 {
            result.add_error("weather.cache_ttl_secs", "Cache TTL must be greater than 0");
        }
        if self.weather.reverse_geocode_ttl_secs == 0 {
            result.add_error(
                "weather.reverse_geocode_ttl_secs",
                "Reverse geocode TTL must be greater than 0",
            );
        }

        if self.weather.refresh_minutes == 0 {
            result.add_warning("weather.refresh_minutes", "Auto refresh disabled (0 minutes)");
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if !(1..=16).contains(&self.weather.forecast_days) {
            result.add_error("weather.forecast_days", "Forecast days must be between 1 and 16");
        }

        if let Some(key) = &self.weather.api_key {
            if key.trim().is_empty() {
                result.add_warning("weather.api_key", "API key is set but empty");
            }
        }

        if let Err(e) = validate_coordinates(self.defaults.latitude, self.defaults.longitude) {
            result.add_error("defaults", e.to_string());
        }
        if self.defaults.location_name.trim().is_empty() {
            result.add_warning("defaults.location_name", "Default location has no name");
        }

        if let Some(dir) = &self.storage.prefs_dir {
            if dir.exists() && !dir.is_dir() {
                result.add_error(
                    "storage.prefs_dir",
                    format!("Path is not a directory: {}", dir.display()),
                );
            }
        }

        result
    }

    /// Directory the preference file lives in.
    pub fn prefs_dir(&self) -> PathBuf {
        self.storage
            .prefs_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.clone())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("abohawa");

        Ok(config_dir.join(CONFIG_FILE))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.forecast_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.forecast_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.geocoding_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_ttl_is_error_zero_refresh_is_warning() {
        let mut config = Config::default();
        config.weather.cache_ttl_secs = 0;
        config.weather.refresh_minutes = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "weather.cache_ttl_secs"));
        assert!(result.warnings.iter().any(|w| w.field == "weather.refresh_minutes"));
        assert_eq!(config.weather.refresh_interval(), None);
    }

    #[test]
    fn test_default_location_must_be_valid() {
        let mut config = Config::default();
        config.defaults.latitude = 123.0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "defaults"));
        assert!(config.defaults.coordinates().is_err());
    }

    #[test]
    fn test_forecast_days_bounds() {
        let mut config = Config::default();
        config.weather.forecast_days = 0;
        assert!(!config.validate().is_valid());
        config.weather.forecast_days = 16;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_load_creates_default_then_round_trips_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abohawa").join(CONFIG_FILE);

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.config_dir, dir.path().join("abohawa"));
        assert_eq!(created.weather.cache_ttl_secs, 300);

        let mut edited = created.clone();
        edited.weather.refresh_minutes = 10;
        edited.defaults.location_name = "Sylhet".to_string();
        edited.defaults.temperature_unit = TemperatureUnit::Fahrenheit;
        edited.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.weather.refresh_minutes, 10);
        assert_eq!(loaded.defaults.location_name, "Sylhet");
        assert_eq!(loaded.defaults.temperature_unit, TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "config_dir = \"/tmp/abohawa\"\n[weather]\nrefresh_minutes = 15\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.refresh_minutes, 15);
        assert_eq!(config.weather.reverse_geocode_ttl_secs, 1800);
        assert_eq!(config.defaults.location_name, "Dhaka");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "this is = = not toml").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_client_config_carries_settings() {
        let mut weather = WeatherConfig::default();
        weather.api_key = Some("k".to_string());
        weather.timeout_secs = 3;
        let client = weather.client_config();
        assert_eq!(client.api_key.as_deref(), Some("k"));
        assert_eq!(client.timeout, Duration::from_secs(3));
        assert_eq!(client.forecast_days, 7);
        assert_eq!(weather.refresh_interval(), Some(Duration::from_secs(300)));
    }
}
