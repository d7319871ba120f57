#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use abohawa_weather::{
    Clock, ForecastDay, ForecastSnapshot, PlaceCandidate, ValidationError, WeatherApi,
    WeatherError, WeatherSnapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

use crate::controller::{Dashboard, DashboardSettings, Selection};

pub const DHAKA: (f64, f64) = (23.8103, 90.4125);
pub const SYLHET: (f64, f64) = (24.8949, 91.8687);
pub const KHULNA: (f64, f64) = (22.8456, 89.5403);

/// Follows tokio's (pausable) clock from a fixed UTC start.
#[derive(Debug)]
pub struct TokioClock {
    base: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap(),
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.start;
        self.base + chrono::Duration::from_std(elapsed).unwrap()
    }
}

pub fn snapshot(temperature: f64) -> WeatherSnapshot {
    let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    WeatherSnapshot {
        temperature,
        feels_like: temperature + 4.0,
        humidity: 74.0,
        wind_speed: 9.7,
        wind_direction: 225.0,
        condition_code: 2,
        sunrise: day.and_hms_opt(5, 54, 0),
        sunset: day.and_hms_opt(17, 31, 0),
        timezone_offset: 21600,
    }
}

pub fn forecast() -> ForecastSnapshot {
    let start = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    ForecastSnapshot {
        days: (0..7)
            .map(|i| ForecastDay {
                date: start + chrono::Duration::days(i),
                max_temp: 32.0,
                min_temp: 24.0,
                condition_code: if i == 1 { 61 } else { 1 },
            })
            .collect(),
    }
}

#[derive(Default)]
struct FakeState {
    current_calls: AtomicUsize,
    forecast_calls: AtomicUsize,
    reverse_calls: AtomicUsize,
    delays: Mutex<Vec<(f64, Duration)>>,
    failing: Mutex<Vec<(f64, WeatherError)>>,
    panicking: Mutex<Vec<f64>>,
    current_error: Mutex<Option<WeatherError>>,
    forecast_error: Mutex<Option<WeatherError>>,
    temperature: Mutex<Option<f64>>,
    place: Mutex<Option<Result<Option<String>, WeatherError>>>,
}

/// In-memory `WeatherApi`. Temperature defaults to the latitude so tests
/// can tell which location's data landed.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(&self, latitude: f64, by: Duration) {
        self.state.delays.lock().push((latitude, by));
    }

    pub fn fail_at(&self, latitude: f64, error: WeatherError) {
        self.state.failing.lock().push((latitude, error));
    }

    /// Make `fetch_current` panic for this latitude.
    pub fn panic_at(&self, latitude: f64) {
        self.state.panicking.lock().push(latitude);
    }

    pub fn fail_current(&self, error: Option<WeatherError>) {
        *self.state.current_error.lock() = error;
    }

    pub fn fail_forecast(&self, error: Option<WeatherError>) {
        *self.state.forecast_error.lock() = error;
    }

    pub fn set_temperature(&self, celsius: f64) {
        *self.state.temperature.lock() = Some(celsius);
    }

    pub fn set_place(&self, result: Result<Option<String>, WeatherError>) {
        *self.state.place.lock() = Some(result);
    }

    pub fn current_calls(&self) -> usize {
        self.state.current_calls.load(Ordering::SeqCst)
    }

    pub fn forecast_calls(&self) -> usize {
        self.state.forecast_calls.load(Ordering::SeqCst)
    }

    pub fn reverse_calls(&self) -> usize {
        self.state.reverse_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self, latitude: f64) {
        let delay = self
            .state
            .delays
            .lock()
            .iter()
            .find(|(lat, _)| *lat == latitude)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn failure(&self, latitude: f64) -> Option<WeatherError> {
        self.state
            .failing
            .lock()
            .iter()
            .find(|(lat, _)| *lat == latitude)
            .map(|(_, e)| e.clone())
    }
}

#[async_trait]
impl WeatherApi for FakeApi {
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, WeatherError> {
        abohawa_weather::validate_coordinates(latitude, longitude)?;
        self.state.current_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(latitude).await;
        if self.state.panicking.lock().contains(&latitude) {
            panic!("fake upstream crashed at {}", latitude);
        }
        if let Some(error) = self.failure(latitude) {
            return Err(error);
        }
        if let Some(error) = self.state.current_error.lock().clone() {
            return Err(error);
        }
        let temperature = self.state.temperature.lock().unwrap_or(latitude);
        Ok(snapshot(temperature))
    }

    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastSnapshot, WeatherError> {
        abohawa_weather::validate_coordinates(latitude, longitude)?;
        self.state.forecast_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(latitude).await;
        if let Some(error) = self.state.forecast_error.lock().clone() {
            return Err(error);
        }
        Ok(forecast())
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, WeatherError> {
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        Ok(vec![PlaceCandidate {
            name: query.trim().to_string(),
            country: Some("Bangladesh".to_string()),
            admin1: None,
            latitude: DHAKA.0,
            longitude: DHAKA.1,
        }])
    }

    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, WeatherError> {
        abohawa_weather::validate_coordinates(latitude, longitude)?;
        self.state.reverse_calls.fetch_add(1, Ordering::SeqCst);
        self.state.place.lock().clone().unwrap_or(Ok(None))
    }
}

pub fn settings() -> DashboardSettings {
    DashboardSettings {
        cache_ttl: Duration::from_secs(300),
        reverse_geocode_ttl: Duration::from_secs(1800),
        refresh_interval: Some(Duration::from_secs(300)),
    }
}

pub fn dashboard(api: &FakeApi) -> Dashboard<FakeApi> {
    dashboard_with(api, settings())
}

pub fn dashboard_with(api: &FakeApi, settings: DashboardSettings) -> Dashboard<FakeApi> {
    Dashboard::builder(api.clone())
        .settings(settings)
        .clock(Arc::new(TokioClock::new()))
        .initial(
            Selection::new("Dhaka", DHAKA.0, DHAKA.1).unwrap(),
            Default::default(),
        )
        .build()
        .unwrap()
}
