//! Weather-specific error types.

use thiserror::Error;

/// Input rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("search query is empty")]
    EmptyQuery,

    #[error("no catalog location matches {0}")]
    UnknownLocation(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid API credential")]
    Auth,

    #[error("Rate limited by weather service")]
    RateLimit,

    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "That location is not valid. Pick another one.",
            Self::Auth => "Invalid API key. Check your weather settings.",
            Self::RateLimit => "Too many requests. Please try again later.",
            Self::NotFound(_) => "Location not found.",
            Self::Connectivity(_) => "Unable to reach the weather service. Check your connection.",
            Self::Parse(_) => "Weather data was malformed. Please try again.",
        }
    }

    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Connectivity(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
