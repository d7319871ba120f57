//! Open-Meteo forecast client with Nominatim reverse geocoding.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ValidationError, WeatherError};
use crate::geocode;
use crate::types::{Coordinates, ForecastDay, ForecastSnapshot, PlaceCandidate, WeatherSnapshot};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const REVERSE_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org/reverse";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,wind_speed_10m,wind_direction_10m,weather_code";
const SUN_FIELDS: &str = "sunrise,sunset";
const FORECAST_DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";
const USER_AGENT: &str = concat!("abohawa/", env!("CARGO_PKG_VERSION"));
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// The upstream calls the dashboard depends on.
#[async_trait]
pub trait WeatherApi: Send + Sync + 'static {
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, WeatherError>;

    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastSnapshot, WeatherError>;

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, WeatherError>;

    /// Place name for a point, `None` when the service knows none.
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherClientConfig {
    pub forecast_url: String,
    pub geocoding_url: String,
    pub reverse_geocoding_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub forecast_days: u8,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            forecast_url: FORECAST_URL.to_string(),
            geocoding_url: GEOCODING_URL.to_string(),
            reverse_geocoding_url: REVERSE_GEOCODING_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            forecast_days: 7,
        }
    }
}

impl WeatherClientConfig {
    /// Point every endpoint at one host, e.g. a local mock server.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            forecast_url: format!("{}/v1/forecast", base),
            geocoding_url: format!("{}/v1/search", base),
            reverse_geocoding_url: format!("{}/reverse", base),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherClientConfig,
}

#[derive(Debug, Serialize)]
struct CurrentQuery<'a> {
    latitude: f64,
    longitude: f64,
    current: &'a str,
    daily: &'a str,
    timezone: &'a str,
    forecast_days: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    apikey: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ForecastQuery<'a> {
    latitude: f64,
    longitude: f64,
    daily: &'a str,
    timezone: &'a str,
    forecast_days: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    apikey: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    name: &'a str,
    count: usize,
    language: &'a str,
    format: &'a str,
}

#[derive(Debug, Serialize)]
struct ReverseQuery<'a> {
    lat: f64,
    lon: f64,
    format: &'a str,
    addressdetails: u8,
    zoom: u8,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    current: CurrentBlock,
    daily: Option<SunBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct SunBlock {
    #[serde(default)]
    sunrise: Vec<String>,
    #[serde(default)]
    sunset: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: ForecastDaily,
}

#[derive(Debug, Deserialize)]
struct ForecastDaily {
    time: Vec<String>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

impl WeatherClient {
    pub fn new(config: WeatherClientConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WeatherClientConfig {
        &self.config
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String, WeatherError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.text().await?)
        } else if status.as_u16() == 401 {
            Err(WeatherError::Auth)
        } else if status.as_u16() == 429 {
            Err(WeatherError::RateLimit)
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::NotFound(text))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::Connectivity(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl WeatherApi for WeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let coords = Coordinates::new(latitude, longitude)?;
        let query = CurrentQuery {
            latitude: coords.latitude,
            longitude: coords.longitude,
            current: CURRENT_FIELDS,
            daily: SUN_FIELDS,
            timezone: "auto",
            forecast_days: 1,
            apikey: self.config.api_key.as_deref(),
        };

        let body = self
            .execute(self.client.get(&self.config.forecast_url).query(&query))
            .await?;
        parse_current(&body)
    }

    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastSnapshot, WeatherError> {
        let coords = Coordinates::new(latitude, longitude)?;
        let query = ForecastQuery {
            latitude: coords.latitude,
            longitude: coords.longitude,
            daily: FORECAST_DAILY_FIELDS,
            timezone: "auto",
            forecast_days: self.config.forecast_days,
            apikey: self.config.api_key.as_deref(),
        };

        let body = self
            .execute(self.client.get(&self.config.forecast_url).query(&query))
            .await?;
        parse_forecast(&body)
    }

    #[instrument(skip(self), level = "info")]
    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, WeatherError> {
        let name = query.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let query = SearchQuery {
            name,
            count: geocode::MAX_SEARCH_CANDIDATES,
            language: "en",
            format: "json",
        };

        let body = self
            .execute(self.client.get(&self.config.geocoding_url).query(&query))
            .await?;
        geocode::parse_search(&body)
    }

    #[instrument(skip(self), level = "info")]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, WeatherError> {
        let coords = Coordinates::new(latitude, longitude)?;
        let query = ReverseQuery {
            lat: coords.latitude,
            lon: coords.longitude,
            format: "json",
            addressdetails: 1,
            zoom: 10,
        };

        let body = self
            .execute(
                self.client
                    .get(&self.config.reverse_geocoding_url)
                    .query(&query),
            )
            .await?;
        let label = geocode::parse_reverse(&body)?;
        if let Some(name) = &label {
            tracing::info!("Reverse geocoded to: {}", name);
        }
        Ok(label)
    }
}

fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, LOCAL_TIME_FORMAT).ok()
}

fn parse_current(body: &str) -> Result<WeatherSnapshot, WeatherError> {
    let parsed: CurrentResponse = serde_json::from_str(body)?;
    let current = parsed.current;
    let (sunrise, sunset) = match parsed.daily {
        Some(sun) => (
            sun.sunrise.first().and_then(|s| parse_local_time(s)),
            sun.sunset.first().and_then(|s| parse_local_time(s)),
        ),
        None => (None, None),
    };

    Ok(WeatherSnapshot {
        temperature: current.temperature_2m,
        feels_like: current.apparent_temperature,
        humidity: current.relative_humidity_2m,
        wind_speed: current.wind_speed_10m,
        wind_direction: current.wind_direction_10m,
        condition_code: current.weather_code,
        sunrise,
        sunset,
        timezone_offset: parsed.utc_offset_seconds,
    })
}

fn parse_forecast(body: &str) -> Result<ForecastSnapshot, WeatherError> {
    let daily = serde_json::from_str::<ForecastResponse>(body)?.daily;

    let len = daily.time.len();
    if daily.weather_code.len() != len
        || daily.temperature_2m_max.len() != len
        || daily.temperature_2m_min.len() != len
    {
        return Err(WeatherError::Parse(
            "daily arrays have mismatched lengths".to_string(),
        ));
    }

    let mut days = Vec::with_capacity(len);
    for idx in 0..len {
        let date = NaiveDate::parse_from_str(&daily.time[idx], "%Y-%m-%d")
            .map_err(|e| WeatherError::Parse(format!("bad date {}: {}", daily.time[idx], e)))?;
        let missing = |field: &str| WeatherError::Parse(format!("{} missing for {}", field, date));
        days.push(ForecastDay {
            date,
            condition_code: daily.weather_code[idx].ok_or_else(|| missing("weather_code"))?,
            max_temp: daily.temperature_2m_max[idx].ok_or_else(|| missing("temperature_2m_max"))?,
            min_temp: daily.temperature_2m_min[idx].ok_or_else(|| missing("temperature_2m_min"))?,
        });
    }

    Ok(ForecastSnapshot { days })
}
