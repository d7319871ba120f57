//! Rendering-agnostic view model built from `DashboardState`.

use std::fmt;

use abohawa_weather::{resolve, wind_direction_label, ConditionCategory, TemperatureUnit, TimeOfDay};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::controller::{DashboardState, Phase};

pub const PLACEHOLDER: &str = "--";
pub const ERROR_STATUS: &str = "Error loading data";
pub const LOADING_STATUS: &str = "Loading...";
pub const IDLE_STATUS: &str = "Waiting for data";

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub day: String,
    pub condition: String,
    pub icon: String,
    pub high: String,
    pub low: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub phase: Phase,
    pub location: String,
    pub status: String,
    pub icon: String,
    pub category: Option<ConditionCategory>,
    pub time_of_day: Option<TimeOfDay>,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind: String,
    pub sunrise: String,
    pub sunset: String,
    pub last_updated: String,
    pub unit: TemperatureUnit,
    pub error: Option<String>,
    pub forecast: Vec<ForecastRow>,
}

fn degrees(unit: TemperatureUnit, celsius: f64) -> String {
    format!("{}{}", unit.display_degrees(celsius), unit.symbol())
}

fn clock_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// `HH:MM` in the location's own timezone when known, UTC otherwise.
fn updated_at(at: DateTime<Utc>, offset_secs: Option<i32>) -> String {
    match offset_secs.and_then(FixedOffset::east_opt) {
        Some(offset) => at.with_timezone(&offset).format("%H:%M").to_string(),
        None => at.format("%H:%M").to_string(),
    }
}

impl DashboardView {
    /// `now` decides day or night at the shown location.
    pub fn from_state(state: &DashboardState, now: DateTime<Utc>) -> Self {
        let unit = state.unit();
        let location = match (state.phase(), state.loading()) {
            (Phase::Loading, Some(pending)) => pending.name().to_string(),
            _ => state.selection().name().to_string(),
        };

        let mut view = Self {
            phase: state.phase(),
            location,
            status: IDLE_STATUS.to_string(),
            icon: PLACEHOLDER.to_string(),
            category: None,
            time_of_day: None,
            temperature: PLACEHOLDER.to_string(),
            feels_like: PLACEHOLDER.to_string(),
            humidity: PLACEHOLDER.to_string(),
            wind: PLACEHOLDER.to_string(),
            sunrise: PLACEHOLDER.to_string(),
            sunset: PLACEHOLDER.to_string(),
            last_updated: PLACEHOLDER.to_string(),
            unit,
            error: None,
            forecast: Vec::new(),
        };

        if state.phase() == Phase::Error {
            view.status = ERROR_STATUS.to_string();
            view.error = state.last_error().map(|e| e.user_message().to_string());
            return view;
        }

        if let Some(current) = state.current() {
            let condition = resolve(current.condition_code);
            view.status = condition.label.to_string();
            view.icon = condition.icon.to_string();
            view.category = Some(condition.category);
            view.time_of_day = Some(current.time_of_day(now));
            view.temperature = degrees(unit, current.temperature);
            view.feels_like = degrees(unit, current.feels_like);
            view.humidity = format!("{:.0}%", current.humidity);
            view.wind = format!(
                "{:.1} km/h {}",
                current.wind_speed,
                wind_direction_label(current.wind_direction)
            );
            view.sunrise = clock_time(current.sunrise);
            view.sunset = clock_time(current.sunset);
        }

        if let Some(at) = state.last_updated() {
            view.last_updated = updated_at(at, state.current().map(|c| c.timezone_offset));
        }

        if let Some(forecast) = state.forecast() {
            view.forecast = forecast
                .days
                .iter()
                .enumerate()
                .map(|(index, day)| {
                    let condition = resolve(day.condition_code);
                    ForecastRow {
                        day: day.day_label(index).to_string(),
                        condition: condition.label.to_string(),
                        icon: condition.icon.to_string(),
                        high: degrees(unit, day.max_temp),
                        low: degrees(unit, day.min_temp),
                    }
                })
                .collect();
        }

        if state.phase() == Phase::Loading {
            view.status = LOADING_STATUS.to_string();
        }

        view
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}  [{}]", self.location, self.status)?;
        writeln!(
            f,
            "  {}  feels like {}  humidity {}  wind {}",
            self.temperature, self.feels_like, self.humidity, self.wind
        )?;
        writeln!(
            f,
            "  sunrise {}  sunset {}  updated {}",
            self.sunrise, self.sunset, self.last_updated
        )?;
        if let Some(error) = &self.error {
            writeln!(f, "  ! {}", error)?;
        }
        for row in &self.forecast {
            writeln!(
                f,
                "  {:<5} {:>6} / {:<6} {}",
                row.day, row.high, row.low, row.condition
            )?;
        }
        Ok(())
    }
}
