//! Top-level error hierarchy.
//!
//! Every error surfaced to the front-end converts into `AppError`, whose
//! `user_message()` is safe to show as-is.

use abohawa_weather::WeatherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Preference storage failures. Callers log these and carry on.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Weather(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Storage(_) => "Could not save your preferences.",
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abohawa_weather::ValidationError;

    #[test]
    fn test_weather_errors_keep_their_message() {
        let err: AppError = WeatherError::RateLimit.into();
        assert_eq!(err.user_message(), WeatherError::RateLimit.user_message());

        let err: AppError = WeatherError::from(ValidationError::InvalidLongitude(200.0)).into();
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_user_messages_hide_detail() {
        let err = AppError::Storage("/tmp/prefs.json: permission denied".into());
        assert!(!err.user_message().contains("/tmp"));

        let err: AppError = ConfigError::ParseError("line 3".into()).into();
        assert!(err.user_message().contains("malformed"));

        let err: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
